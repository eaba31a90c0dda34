use std::time::Duration;
use chrono::{DateTime, Utc};
use tokio::time::timeout;
use tracing::{info, warn};
use crate::domain::models::{booking::Booking, event_type::EventType};
use crate::domain::ports::{CalendarEventData, CalendarService};

/// Busy-check that never blocks a booking: errors and timeouts count as free.
pub async fn is_busy_fail_open(
    calendar: &dyn CalendarService,
    host_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    limit: Duration,
) -> bool {
    match timeout(limit, calendar.is_busy(host_id, start, end)).await {
        Ok(Ok(busy)) => busy,
        Ok(Err(e)) => {
            warn!(calendar_fail_open = true, host_id = %host_id, error = %e, "Calendar busy-check failed, treating host as free");
            false
        }
        Err(_) => {
            warn!(calendar_fail_open = true, host_id = %host_id, timeout_ms = limit.as_millis() as u64, "Calendar busy-check timed out, treating host as free");
            false
        }
    }
}

pub fn event_data(event_type: &EventType, booking: &Booking) -> CalendarEventData {
    CalendarEventData {
        title: format!("{} with {}", event_type.title, booking.attendee_name),
        description: booking.attendee_notes.clone().or_else(|| event_type.description.clone()),
        start_time: booking.start_time,
        end_time: booking.end_time,
        location: booking.meeting_url.clone(),
        attendee_email: Some(booking.attendee_email.clone()),
        attendee_name: Some(booking.attendee_name.clone()),
    }
}

/// Creates the external event after the booking is durable. Returns the
/// remote id when one was created.
pub async fn push_created(calendar: &dyn CalendarService, event_type: &EventType, booking: &Booking) -> Option<String> {
    match calendar.create_event(&booking.host_id, &event_data(event_type, booking)).await {
        Ok(id) => {
            if let Some(id) = &id {
                info!(booking_id = %booking.id, calendar_event_id = %id, "Calendar event created");
            }
            id
        }
        Err(e) => {
            warn!(booking_id = %booking.id, error = %e, "Calendar event creation failed");
            None
        }
    }
}

pub async fn push_updated(calendar: &dyn CalendarService, event_type: &EventType, booking: &Booking) {
    let Some(event_id) = &booking.calendar_event_id else { return };
    if let Err(e) = calendar.update_event(&booking.host_id, event_id, &event_data(event_type, booking)).await {
        warn!(booking_id = %booking.id, error = %e, "Calendar event update failed");
    }
}

pub async fn push_deleted(calendar: &dyn CalendarService, booking: &Booking) {
    let Some(event_id) = &booking.calendar_event_id else { return };
    if let Err(e) = calendar.delete_event(&booking.host_id, event_id).await {
        warn!(booking_id = %booking.id, error = %e, "Calendar event deletion failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::CalendarEventData;
    use crate::error::AppError;
    use async_trait::async_trait;

    enum Behaviour {
        Busy,
        Free,
        Fails,
        Hangs,
    }

    struct StubCalendar(Behaviour);

    #[async_trait]
    impl CalendarService for StubCalendar {
        async fn is_busy(&self, _host_id: &str, _start: DateTime<Utc>, _end: DateTime<Utc>) -> Result<bool, AppError> {
            match self.0 {
                Behaviour::Busy => Ok(true),
                Behaviour::Free => Ok(false),
                Behaviour::Fails => Err(AppError::InternalWithMsg("calendar down".into())),
                Behaviour::Hangs => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(true)
                }
            }
        }
        async fn create_event(&self, _host_id: &str, _event: &CalendarEventData) -> Result<Option<String>, AppError> {
            Ok(None)
        }
        async fn update_event(&self, _host_id: &str, _event_id: &str, _event: &CalendarEventData) -> Result<(), AppError> {
            Ok(())
        }
        async fn delete_event(&self, _host_id: &str, _event_id: &str) -> Result<(), AppError> {
            Ok(())
        }
    }

    async fn check(behaviour: Behaviour) -> bool {
        let now = Utc::now();
        is_busy_fail_open(&StubCalendar(behaviour), "host", now, now, Duration::from_millis(50)).await
    }

    #[tokio::test]
    async fn test_genuine_answers_pass_through() {
        assert!(check(Behaviour::Busy).await);
        assert!(!check(Behaviour::Free).await);
    }

    #[tokio::test]
    async fn test_failures_and_timeouts_fail_open() {
        assert!(!check(Behaviour::Fails).await);
        assert!(!check(Behaviour::Hangs).await);
    }
}
