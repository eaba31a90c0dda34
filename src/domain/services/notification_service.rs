use chrono_tz::Tz;
use tera::{Context, Tera};
use tracing::{info, warn};
use crate::domain::models::{booking::Booking, event_type::{EventType, LOCATION_MIROTALK}, job, user::User};
use crate::domain::ports::EmailService;
use crate::domain::services::calendar::generate_ics;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Confirmation,
    Reminder,
    Cancellation,
    Reschedule,
    Update,
    MeetingLink,
}

impl NotificationKind {
    pub fn from_job_type(job_type: &str) -> Option<Self> {
        match job_type {
            job::JOB_CONFIRMATION => Some(Self::Confirmation),
            job::JOB_REMINDER => Some(Self::Reminder),
            job::JOB_CANCELLATION => Some(Self::Cancellation),
            job::JOB_RESCHEDULE => Some(Self::Reschedule),
            job::JOB_UPDATE => Some(Self::Update),
            job::JOB_MEETING_LINK => Some(Self::MeetingLink),
            _ => None,
        }
    }

    pub fn job_type(&self) -> &'static str {
        match self {
            Self::Confirmation => job::JOB_CONFIRMATION,
            Self::Reminder => job::JOB_REMINDER,
            Self::Cancellation => job::JOB_CANCELLATION,
            Self::Reschedule => job::JOB_RESCHEDULE,
            Self::Update => job::JOB_UPDATE,
            Self::MeetingLink => job::JOB_MEETING_LINK,
        }
    }

    fn template(&self) -> &'static str {
        match self {
            Self::Confirmation => "confirmation.html",
            Self::Reminder => "reminder.html",
            Self::Cancellation => "cancellation.html",
            Self::Reschedule => "reschedule.html",
            Self::Update => "update.html",
            Self::MeetingLink => "meeting_link.html",
        }
    }

    fn subject(&self, title: &str) -> String {
        match self {
            Self::Confirmation => format!("Booking Confirmed: {}", title),
            Self::Reminder => format!("Reminder: {} starts soon", title),
            Self::Cancellation => format!("Cancelled: {}", title),
            Self::Reschedule => format!("Rescheduled: {}", title),
            Self::Update => format!("Updated: {}", title),
            Self::MeetingLink => format!("Meeting link for {}", title),
        }
    }
}

pub fn load_templates() -> Result<Tera, AppError> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", include_str!("../../templates/base.html")),
        ("confirmation.html", include_str!("../../templates/confirmation.html")),
        ("reminder.html", include_str!("../../templates/reminder.html")),
        ("cancellation.html", include_str!("../../templates/cancellation.html")),
        ("reschedule.html", include_str!("../../templates/reschedule.html")),
        ("update.html", include_str!("../../templates/update.html")),
        ("meeting_link.html", include_str!("../../templates/meeting_link.html")),
    ])
    .map_err(|e| AppError::InternalWithMsg(format!("Tera parse error: {:?}", e)))?;
    Ok(tera)
}

pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub attachment: Option<(&'static str, Vec<u8>)>,
}

fn location_label(event_type: &EventType) -> String {
    match event_type.location_type.as_str() {
        LOCATION_MIROTALK => "MiroTalk Video".to_string(),
        "" => "Online".to_string(),
        other => other.replace('_', " "),
    }
}

pub fn render(
    tera: &Tera,
    kind: NotificationKind,
    booking: &Booking,
    event_type: &EventType,
    host: &User,
    public_base_url: &str,
) -> Result<RenderedEmail, AppError> {
    let tz: Tz = host.timezone.parse().unwrap_or(chrono_tz::UTC);
    let start = booking.start_time.with_timezone(&tz);
    let end = booking.end_time.with_timezone(&tz);

    let mut context = Context::new();
    context.insert("attendee_name", &booking.attendee_name);
    context.insert("event_title", &event_type.title);
    context.insert("host_name", &host.name);
    context.insert("date", &start.format("%A, %B %-d, %Y").to_string());
    context.insert("start_time", &start.format("%H:%M").to_string());
    context.insert("end_time", &end.format("%H:%M").to_string());
    context.insert("timezone", &host.timezone);
    context.insert("location", &location_label(event_type));
    context.insert("meeting_url", &booking.meeting_url);
    context.insert("notes", &booking.attendee_notes);
    context.insert("ical_url", &format!("{}/api/v1/bookings/{}/ical", public_base_url.trim_end_matches('/'), booking.id));

    let html = tera
        .render(kind.template(), &context)
        .map_err(|e| AppError::InternalWithMsg(format!("Tera render error: {:?}", e)))?;

    let attachment = match kind {
        NotificationKind::Confirmation | NotificationKind::Reschedule => {
            Some(("invite.ics", generate_ics(event_type, booking, host).into_bytes()))
        }
        _ => None,
    };

    Ok(RenderedEmail { subject: kind.subject(&event_type.title), html, attachment })
}

pub async fn deliver(
    email_service: &dyn EmailService,
    tera: &Tera,
    kind: NotificationKind,
    booking: &Booking,
    event_type: &EventType,
    host: &User,
    public_base_url: &str,
) -> Result<(), AppError> {
    let email = render(tera, kind, booking, event_type, host, public_base_url)?;
    let (name, data) = match &email.attachment {
        Some((name, data)) => (Some(*name), Some(data.as_slice())),
        None => (None, None),
    };

    info!(booking_id = %booking.id, kind = kind.job_type(), "Sending notification to {}", booking.attendee_email);
    email_service.send(&booking.attendee_email, &email.subject, &email.html, name, data).await
}

/// Sends without a job row, for bookings that no longer exist.
pub fn spawn_best_effort(
    email_service: std::sync::Arc<dyn EmailService>,
    tera: std::sync::Arc<Tera>,
    kind: NotificationKind,
    booking: Booking,
    event_type: EventType,
    host: User,
    public_base_url: String,
) {
    tokio::spawn(async move {
        if let Err(e) = deliver(email_service.as_ref(), &tera, kind, &booking, &event_type, &host, &public_base_url).await {
            warn!(booking_id = %booking.id, error = %e, "Best-effort notification failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::booking::{BookingStatus, NewBookingParams};
    use crate::domain::models::event_type::NewEventTypeParams;
    use crate::domain::models::user::{NewUserParams, ROLE_OWNER};
    use chrono::{Duration, TimeZone, Utc};

    fn fixtures() -> (Booking, EventType, User) {
        let mut host = User::new(NewUserParams {
            organization_id: "org".into(),
            name: "Hannah Host".into(),
            email: "hannah@example.com".into(),
            password_hash: String::new(),
            role: ROLE_OWNER,
        });
        host.timezone = "Europe/Berlin".into();
        let event_type = EventType::new(NewEventTypeParams {
            organization_id: "org".into(),
            owner_id: host.id.clone(),
            title: "Discovery Call".into(),
            slug: "discovery-call".into(),
            description: None,
            duration_minutes: 30,
            location_type: LOCATION_MIROTALK.into(),
        });
        let start = Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap();
        let booking = Booking::new(NewBookingParams {
            organization_id: "org".into(),
            event_type_id: event_type.id.clone(),
            host_id: host.id.clone(),
            start,
            end: start + Duration::minutes(30),
            attendee_name: "Gina Guest".into(),
            attendee_email: "gina@example.com".into(),
            attendee_phone: None,
            attendee_notes: Some("Looking forward".into()),
            status: BookingStatus::Confirmed,
            meeting_url: Some("https://p2p.mirotalk.com/join/room1".into()),
        });
        (booking, event_type, host)
    }

    #[test]
    fn test_every_kind_renders() {
        let tera = load_templates().unwrap();
        let (booking, event_type, host) = fixtures();

        for kind in [
            NotificationKind::Confirmation,
            NotificationKind::Reminder,
            NotificationKind::Cancellation,
            NotificationKind::Reschedule,
            NotificationKind::Update,
            NotificationKind::MeetingLink,
        ] {
            let email = render(&tera, kind, &booking, &event_type, &host, "http://localhost:3000").unwrap();
            assert!(email.html.contains("Gina Guest"), "{:?} misses attendee", kind);
            assert!(email.subject.contains("Discovery Call"));
            assert_eq!(NotificationKind::from_job_type(kind.job_type()), Some(kind));
        }
    }

    #[test]
    fn test_confirmation_uses_host_timezone_and_attaches_invite() {
        let tera = load_templates().unwrap();
        let (booking, event_type, host) = fixtures();

        let email = render(&tera, NotificationKind::Confirmation, &booking, &event_type, &host, "http://localhost:3000/").unwrap();
        // 09:00 UTC is 10:00 in Berlin in January.
        assert!(email.html.contains("10:00"));
        assert!(email.html.contains("room1"));
        assert!(email.html.contains(&format!("http://localhost:3000/api/v1/bookings/{}/ical", booking.id)));
        let (name, data) = email.attachment.unwrap();
        assert_eq!(name, "invite.ics");
        assert!(String::from_utf8(data).unwrap().contains("Discovery Call"));

        let reminder = render(&tera, NotificationKind::Reminder, &booking, &event_type, &host, "").unwrap();
        assert!(reminder.attachment.is_none());
    }
}
