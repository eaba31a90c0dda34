use crate::domain::models::{booking::Booking, event_type::EventType, user::User};
use icalendar::{Calendar, Component, Event as IcalEvent, EventLike, EventStatus, Property};

/// Location shown in calendars: the meeting link wins over the location mode.
pub fn display_location(event_type: &EventType, booking: &Booking) -> String {
    booking
        .meeting_url
        .clone()
        .unwrap_or_else(|| if event_type.location_type.is_empty() { "Online".to_string() } else { event_type.location_type.clone() })
}

fn describe(event_type: &EventType, booking: &Booking, host: &User) -> String {
    let mut parts = vec![
        event_type
            .description
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("Meeting with {}", host.name)),
    ];
    if let Some(url) = &booking.meeting_url {
        parts.push(format!("Meeting Link: {}", url));
    }
    parts.push(format!("Attendee: {} ({})", booking.attendee_name, booking.attendee_email));
    parts.join("\n\n")
}

/// Generates an iCalendar (.ics) document for a booking.
pub fn generate_ics(event_type: &EventType, booking: &Booking, host: &User) -> String {
    let mut calendar = Calendar::new();
    calendar.name("Scheduled Meeting");

    let mut ical_event = IcalEvent::new();
    ical_event
        .summary(&event_type.title)
        .description(&describe(event_type, booking, host))
        .location(&display_location(event_type, booking))
        .starts(booking.start_time)
        .ends(booking.end_time)
        .uid(&booking.id)
        .append_property(
            Property::new("ORGANIZER", format!("mailto:{}", host.email))
                .add_parameter("CN", &host.name)
                .done(),
        )
        .append_property(
            Property::new("ATTENDEE", format!("mailto:{}", booking.attendee_email))
                .add_parameter("CN", &booking.attendee_name)
                .add_parameter("RSVP", "TRUE")
                .done(),
        );

    if booking.status == "cancelled" {
        ical_event.status(EventStatus::Cancelled);
    } else {
        ical_event.status(EventStatus::Confirmed);
    }
    if let Some(url) = &booking.meeting_url {
        ical_event.url(url);
    }

    calendar.push(ical_event.done());
    calendar.done().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::booking::{BookingStatus, NewBookingParams};
    use crate::domain::models::event_type::NewEventTypeParams;
    use crate::domain::models::user::{NewUserParams, ROLE_OWNER};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_ics_contains_booking_details() {
        let host = User::new(NewUserParams {
            organization_id: "org".into(),
            name: "Host Person".into(),
            email: "host@example.com".into(),
            password_hash: String::new(),
            role: ROLE_OWNER,
        });
        let event_type = EventType::new(NewEventTypeParams {
            organization_id: "org".into(),
            owner_id: host.id.clone(),
            title: "Strategy Call".into(),
            slug: "strategy-call".into(),
            description: None,
            duration_minutes: 30,
            location_type: "mirotalk".into(),
        });
        let start = Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap();
        let booking = Booking::new(NewBookingParams {
            organization_id: "org".into(),
            event_type_id: event_type.id.clone(),
            host_id: host.id.clone(),
            start,
            end: start + Duration::minutes(30),
            attendee_name: "Guest".into(),
            attendee_email: "guest@example.com".into(),
            attendee_phone: None,
            attendee_notes: None,
            status: BookingStatus::Confirmed,
            meeting_url: Some("https://p2p.mirotalk.com/join/abc".into()),
        });

        let ics = generate_ics(&event_type, &booking, &host);
        assert!(ics.contains("BEGIN:VCALENDAR"));
        assert!(ics.contains("SUMMARY:Strategy Call"));
        assert!(ics.contains("20300107T090000Z"));
        assert!(ics.contains(&booking.id));
        assert!(ics.contains("STATUS:CONFIRMED"));
    }
}
