//! Property-based tests for conflict detection, slot search and ranking.

use std::sync::Arc;

use proptest::prelude::*;
use ulid::Ulid;

use super::*;
use crate::model::*;
use crate::store::InMemoryStore;
use crate::time::to_time;

const DATE: &str = "2024-06-15";

fn span_strategy() -> impl Strategy<Value = Span> {
    (0i64..1380, 1i64..=240).prop_map(|(start, len)| Span::new(start, start + len))
}

fn reservation_at(span: Span, status: ReservationStatus) -> Reservation {
    Reservation {
        id: Ulid::new(),
        restaurant_id: Ulid::new(),
        table_id: Ulid::new(),
        customer_name: "Prop".into(),
        customer_phone: "+15550000".into(),
        party_size: 2,
        date: chrono::NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
        start: span.start,
        duration_minutes: span.duration(),
        status,
    }
}

fn tables_strategy() -> impl Strategy<Value = Vec<Table>> {
    prop::collection::vec(1u32..=12, 0..10).prop_map(|caps| {
        let restaurant_id = Ulid::new();
        caps.into_iter()
            .enumerate()
            .map(|(i, capacity)| Table {
                id: Ulid::new(),
                restaurant_id,
                number: i as u32 + 1,
                capacity,
                is_available: true,
            })
            .collect()
    })
}

/// Opening hour, closing hour and a duration that fits between them.
fn hours_strategy() -> impl Strategy<Value = (i64, i64, f64)> {
    (0i64..20)
        .prop_flat_map(|open| (Just(open), (open + 2)..=23))
        .prop_flat_map(|(open, close)| (Just(open), Just(close), 1i64..=((close - open) * 2)))
        .prop_map(|(open, close, halves)| (open, close, halves as f64 * 0.5))
}

async fn seeded_engine(
    capacities: &[u32],
    open: i64,
    close: i64,
    bookings: &[(usize, i64, f64)],
) -> (Engine, Restaurant) {
    let store = Arc::new(InMemoryStore::new());
    let restaurant = store
        .create_restaurant(
            "Prop Kitchen",
            &to_time(open * 60),
            &to_time(close * 60),
            capacities.len() as u32,
        )
        .await
        .unwrap();
    let mut tables = Vec::new();
    for (i, &capacity) in capacities.iter().enumerate() {
        tables.push(store.create_table(restaurant.id, i as u32 + 1, capacity).await.unwrap());
    }
    let engine = Engine::new(store, Arc::new(NotifyHub::new()));
    for &(table, start, hours) in bookings {
        let table = &tables[table % tables.len()];
        // Requests outside hours or clashing with earlier ones are simply refused.
        let _ = engine
            .book(BookingRequest {
                restaurant_id: restaurant.id,
                table_id: table.id,
                customer_name: "Prop".into(),
                customer_phone: "+15550000".into(),
                party_size: 1,
                date: DATE.into(),
                time: to_time(start),
                duration_hours: Some(hours),
            })
            .await;
    }
    (engine, restaurant)
}

fn bookings_strategy() -> impl Strategy<Value = Vec<(usize, i64, f64)>> {
    prop::collection::vec(
        (0usize..8, (0i64..46).prop_map(|h| h * 30), (1i64..=6).prop_map(|h| h as f64 * 0.5)),
        0..12,
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 512,
        .. ProptestConfig::default()
    })]

    // Overlap is symmetric and matches the half-open definition.
    #[test]
    fn overlap_is_symmetric(a in span_strategy(), b in span_strategy()) {
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        prop_assert_eq!(a.overlaps(&b), a.start < b.end && b.start < a.end);
    }

    // Reservations that meet end-to-start never conflict.
    #[test]
    fn back_to_back_never_conflicts(start in 0i64..1200, first in 1i64..=120, second in 1i64..=120) {
        let existing = vec![reservation_at(Span::new(start, start + first), ReservationStatus::Confirmed)];
        let after = Span::new(start + first, start + first + second);
        prop_assert!(find_conflict(&existing, &after, None).unwrap().is_none());

        let before = Span::new(start - second, start);
        prop_assert!(find_conflict(&existing, &before, None).unwrap().is_none());
    }

    // Only active reservations ever block a request.
    #[test]
    fn conflict_matches_active_overlaps(
        existing in prop::collection::vec((span_strategy(), 0u8..4), 0..8),
        request in span_strategy(),
    ) {
        let reservations: Vec<Reservation> = existing
            .iter()
            .map(|(span, s)| {
                let status = match s {
                    0 => ReservationStatus::Pending,
                    1 => ReservationStatus::Confirmed,
                    2 => ReservationStatus::Cancelled,
                    _ => ReservationStatus::Completed,
                };
                reservation_at(*span, status)
            })
            .collect();
        let expected = reservations
            .iter()
            .any(|r| r.status.is_active() && Span::new(r.start, r.end()).overlaps(&request));
        let found = find_conflict(&reservations, &request, None).unwrap();
        prop_assert_eq!(found.is_some(), expected);
        if let Some(r) = found {
            prop_assert!(r.status.is_active());
        }
    }

    // Alternatives never include the requested time, respect the limit and
    // come out nearest first.
    #[test]
    fn nearest_slots_are_bounded_and_ordered(
        times in prop::collection::btree_set((0i64..48).prop_map(|h| h * 30), 0..30),
        requested in (0i64..48).prop_map(|h| h * 30),
        limit in 0usize..6,
    ) {
        let slots: Vec<TimeSlot> = times
            .iter()
            .map(|&time| TimeSlot { time, available_tables: 1 })
            .collect();
        let picked = nearest_slots(slots, requested, limit);

        prop_assert!(picked.len() <= limit);
        prop_assert!(picked.iter().all(|s| s.time != requested));
        prop_assert!(picked.iter().all(|s| times.contains(&s.time)));
        for pair in picked.windows(2) {
            prop_assert!((pair[0].time - requested).abs() <= (pair[1].time - requested).abs());
        }
        let others = times.iter().filter(|&&t| t != requested).count();
        prop_assert_eq!(picked.len(), limit.min(others));
    }

    // Ranked tables all seat the party, least waste first, and only the head
    // can be flagged optimal.
    #[test]
    fn rank_orders_by_waste(tables in tables_strategy(), party in 1u32..=12) {
        let ranked = rank(&tables, party);
        let fitting = tables.iter().filter(|t| t.capacity >= party).count();
        prop_assert_eq!(ranked.len(), fitting);
        prop_assert!(ranked.iter().all(|r| r.table.capacity >= party));
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].table.capacity <= pair[1].table.capacity);
        }
        prop_assert!(ranked.iter().skip(1).all(|r| !r.is_optimal));
        if let Some(head) = ranked.first() {
            prop_assert_eq!(head.is_optimal, head.table.capacity == party);
            let best = find_optimal(&tables, party).unwrap();
            prop_assert_eq!(best.table.id, head.table.id);
        } else {
            prop_assert!(find_optimal(&tables, party).is_none());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    // Every offered slot starts inside operating hours, finishes by closing,
    // sits on the granularity grid and is listed once in order.
    #[test]
    fn slots_fit_operating_hours(
        (open, close, hours) in hours_strategy(),
        bookings in bookings_strategy(),
        party in 1u32..=6,
        granularity in prop::sample::select(vec![15i64, 30, 60]),
    ) {
        tokio_test::block_on(async {
            let (engine, restaurant) = seeded_engine(&[2, 4, 6], open, close, &bookings).await;
            let query = SlotQuery::for_restaurant(&restaurant, DATE, party, hours)
                .unwrap()
                .with_granularity(granularity);
            let slots = engine.time_slots(&query).await.unwrap();
            let duration = (hours * 60.0).round() as Minutes;

            for slot in &slots {
                prop_assert!(slot.time >= open * 60);
                prop_assert!(slot.time + duration <= close * 60);
                prop_assert_eq!((slot.time - open * 60) % granularity, 0);
                prop_assert!(slot.available_tables >= 1);
            }
            for pair in slots.windows(2) {
                prop_assert!(pair[0].time < pair[1].time);
            }
            Ok(())
        })?;
    }

    // Raising the minimum capacity can only remove tables from the result.
    #[test]
    fn capacity_filter_is_monotone(
        bookings in bookings_strategy(),
        low in 1u32..=6,
        extra in 0u32..=6,
        start in (20i64..40).prop_map(|h| h * 30),
    ) {
        tokio_test::block_on(async {
            let (engine, restaurant) = seeded_engine(&[2, 2, 4, 4, 6, 8], 10, 23, &bookings).await;
            let time = to_time(start);
            let wide = engine
                .available_tables(restaurant.id, DATE, &time, 1.5, Some(low))
                .await
                .unwrap();
            let narrow = engine
                .available_tables(restaurant.id, DATE, &time, 1.5, Some(low + extra))
                .await
                .unwrap();

            prop_assert!(narrow.iter().all(|t| wide.contains(t)));
            prop_assert!(narrow.iter().all(|t| t.capacity >= low + extra));
            Ok(())
        })?;
    }
}
