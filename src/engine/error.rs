use ulid::Ulid;

/// Failure reported by the storage collaborator. Carried through the engine unchanged.
#[derive(Debug)]
pub enum StoreError {
    Duplicate(Ulid),
    DuplicateTableNumber { restaurant_id: Ulid, number: u32 },
    UnknownRecord(Ulid),
    LogError(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Duplicate(id) => write!(f, "record already exists: {id}"),
            StoreError::DuplicateTableNumber { restaurant_id, number } => {
                write!(f, "table {number} already exists in restaurant {restaurant_id}")
            }
            StoreError::UnknownRecord(id) => write!(f, "no such record: {id}"),
            StoreError::LogError(e) => write!(f, "reservation log error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::LogError(e.to_string())
    }
}

#[derive(Debug)]
pub enum EngineError {
    InvalidFormat { field: &'static str, value: String },
    InvalidArgument(&'static str),
    NotFound { kind: &'static str, id: Ulid },
    /// The requested interval overlaps this active reservation.
    Conflict(Ulid),
    TableOutOfService(Ulid),
    OutsideOperatingHours { requested: String, opening: String, closing: String },
    ExtendsPastClosing { ends: String, closing: String },
    PartySizeExceedsCapacity { party_size: u32, capacity: u32 },
    AlreadyCancelled(Ulid),
    ReservationCancelled(Ulid),
    LimitExceeded(&'static str),
    Store(StoreError),
}

impl EngineError {
    /// Stable machine-readable code for API collaborators.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidFormat { .. } => "INVALID_FORMAT",
            EngineError::InvalidArgument(_) => "INVALID_ARGUMENT",
            EngineError::NotFound { .. } => "NOT_FOUND",
            EngineError::Conflict(_) => "CONFLICT",
            EngineError::TableOutOfService(_) => "TABLE_OUT_OF_SERVICE",
            EngineError::OutsideOperatingHours { .. } => "OUTSIDE_OPERATING_HOURS",
            EngineError::ExtendsPastClosing { .. } => "EXTENDS_PAST_CLOSING",
            EngineError::PartySizeExceedsCapacity { .. } => "PARTY_SIZE_EXCEEDS_CAPACITY",
            EngineError::AlreadyCancelled(_) => "ALREADY_CANCELLED",
            EngineError::ReservationCancelled(_) => "RESERVATION_CANCELLED",
            EngineError::LimitExceeded(_) => "LIMIT_EXCEEDED",
            EngineError::Store(_) => "STORE_ERROR",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidFormat { field, value } => {
                write!(f, "invalid {field} format: {value:?}")
            }
            EngineError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            EngineError::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            EngineError::Conflict(id) => {
                write!(f, "table is not available: conflicts with reservation {id}")
            }
            EngineError::TableOutOfService(id) => write!(f, "table {id} is out of service"),
            EngineError::OutsideOperatingHours { requested, opening, closing } => write!(
                f,
                "reservation time {requested} is outside operating hours {opening} - {closing}"
            ),
            EngineError::ExtendsPastClosing { ends, closing } => {
                write!(f, "reservation ends at {ends}, after closing time {closing}")
            }
            EngineError::PartySizeExceedsCapacity { party_size, capacity } => write!(
                f,
                "party size ({party_size}) exceeds table capacity ({capacity})"
            ),
            EngineError::AlreadyCancelled(id) => write!(f, "reservation {id} is already cancelled"),
            EngineError::ReservationCancelled(id) => {
                write!(f, "cannot modify cancelled reservation {id}")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e)
    }
}
