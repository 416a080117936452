use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;
use ulid::Ulid;

use crate::model::Reservation;
use crate::time::to_time;

const CHANNEL_CAPACITY: usize = 256;

/// Customer-facing message about a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Notice {
    Confirmed {
        reservation: Reservation,
        restaurant: String,
    },
    Updated {
        reservation: Reservation,
        restaurant: String,
        changes: Vec<String>,
    },
    Cancelled {
        reservation: Reservation,
        restaurant: String,
    },
}

impl Notice {
    pub fn reservation(&self) -> &Reservation {
        match self {
            Notice::Confirmed { reservation, .. }
            | Notice::Updated { reservation, .. }
            | Notice::Cancelled { reservation, .. } => reservation,
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Notice::Confirmed { restaurant, .. } => format!("Reservation Confirmed at {restaurant}"),
            Notice::Updated { restaurant, .. } => format!("Reservation Updated at {restaurant}"),
            Notice::Cancelled { restaurant, .. } => format!("Reservation Cancelled at {restaurant}"),
        }
    }

    /// Short text suitable for SMS.
    pub fn sms_text(&self) -> String {
        let r = self.reservation();
        let when = format!("{} at {}", r.date, to_time(r.start));
        match self {
            Notice::Confirmed { restaurant, .. } => format!(
                "Your reservation at {restaurant} is confirmed for {when}. Party of {}. Ref: {}",
                r.party_size, r.id
            ),
            Notice::Updated { restaurant, changes, .. } => format!(
                "Your reservation at {restaurant} was updated: {}. Now {when}. Ref: {}",
                changes.join("; "),
                r.id
            ),
            Notice::Cancelled { restaurant, .. } => format!(
                "Your reservation at {restaurant} for {when} has been cancelled. Ref: {}",
                r.id
            ),
        }
    }
}

/// Per-restaurant broadcast of reservation notices.
///
/// Email and SMS delivery are mocked: every notice is written to the log.
pub struct NotifyHub {
    channels: DashMap<Ulid, broadcast::Sender<Notice>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to notices for a restaurant. Creates the channel if needed.
    pub fn subscribe(&self, restaurant_id: Ulid) -> broadcast::Receiver<Notice> {
        let sender = self
            .channels
            .entry(restaurant_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Deliver a notice. Broadcasting is a no-op if nobody is listening.
    pub fn send(&self, restaurant_id: Ulid, notice: Notice) {
        let r = notice.reservation();
        info!(
            to = %r.customer_name,
            phone = %r.customer_phone,
            subject = %notice.subject(),
            sms = %notice.sms_text(),
            "notification delivered"
        );
        if let Some(sender) = self.channels.get(&restaurant_id) {
            let _ = sender.send(notice);
        }
    }
}
