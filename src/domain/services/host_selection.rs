use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use crate::domain::models::booking::Booking;
use crate::domain::models::event_type::EventTypeWithHosts;

/// Explicitly assigned hosts, or the owner when none are assigned.
pub fn candidate_hosts(event_type: &EventTypeWithHosts) -> Vec<String> {
    if event_type.host_ids.is_empty() {
        vec![event_type.event_type.owner_id.clone()]
    } else {
        let mut hosts = event_type.host_ids.clone();
        hosts.dedup();
        hosts
    }
}

/// Candidates without a blocking booking overlapping `[start, end)`.
pub fn free_hosts(candidates: &[String], bookings: &[Booking], start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<String> {
    candidates
        .iter()
        .filter(|host| {
            !bookings
                .iter()
                .any(|b| &b.host_id == *host && b.blocks_time() && b.overlaps(start, end))
        })
        .cloned()
        .collect()
}

/// Uniformly random free host, `None` when every candidate conflicts.
pub fn select_host<R: Rng + ?Sized>(
    candidates: &[String],
    bookings: &[Booking],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    rng: &mut R,
) -> Option<String> {
    free_hosts(candidates, bookings, start, end).choose(rng).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::booking::{BookingStatus, NewBookingParams};
    use crate::domain::models::event_type::{EventType, NewEventTypeParams};
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 7, h, 0, 0).unwrap()
    }

    fn booking(host: &str, start: DateTime<Utc>, end: DateTime<Utc>, status: BookingStatus) -> Booking {
        Booking::new(NewBookingParams {
            organization_id: "org".into(),
            event_type_id: "evt".into(),
            host_id: host.into(),
            start,
            end,
            attendee_name: "A".into(),
            attendee_email: "a@example.com".into(),
            attendee_phone: None,
            attendee_notes: None,
            status,
            meeting_url: None,
        })
    }

    fn event_type(host_ids: Vec<String>) -> EventTypeWithHosts {
        EventTypeWithHosts {
            event_type: EventType::new(NewEventTypeParams {
                organization_id: "org".into(),
                owner_id: "owner".into(),
                title: "Intro".into(),
                slug: "intro".into(),
                description: None,
                duration_minutes: 60,
                location_type: "in_person".into(),
            }),
            host_ids,
        }
    }

    #[test]
    fn test_candidates_fall_back_to_owner() {
        assert_eq!(candidate_hosts(&event_type(vec![])), vec!["owner".to_string()]);
        assert_eq!(
            candidate_hosts(&event_type(vec!["a".into(), "b".into()])),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_busy_host_is_never_selected() {
        let candidates = vec!["a".to_string(), "b".to_string()];
        let bookings = vec![booking("a", at(14), at(15), BookingStatus::Confirmed)];
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let chosen = select_host(&candidates, &bookings, at(14), at(15), &mut rng);
            assert_eq!(chosen.as_deref(), Some("b"));
        }
    }

    #[test]
    fn test_all_busy_returns_none() {
        let candidates = vec!["a".to_string(), "b".to_string()];
        let bookings = vec![
            booking("a", at(13), at(15), BookingStatus::Confirmed),
            booking("b", at(14), at(16), BookingStatus::Rejected),
        ];
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(select_host(&candidates, &bookings, at(14), at(15), &mut rng), None);
    }

    #[test]
    fn test_cancelled_and_adjacent_bookings_leave_host_free() {
        let candidates = vec!["a".to_string()];
        let bookings = vec![
            booking("a", at(14), at(15), BookingStatus::Cancelled),
            booking("a", at(13), at(14), BookingStatus::Confirmed),
            booking("a", at(15), at(16), BookingStatus::Confirmed),
        ];

        assert_eq!(free_hosts(&candidates, &bookings, at(14), at(15)), candidates);
    }

    #[test]
    fn test_selection_spreads_across_free_hosts() {
        let candidates = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = HashSet::new();

        for _ in 0..300 {
            if let Some(host) = select_host(&candidates, &[], at(9), at(10), &mut rng) {
                seen.insert(host);
            }
        }
        assert_eq!(seen.len(), 3);
    }
}
