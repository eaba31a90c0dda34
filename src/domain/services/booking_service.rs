use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use rand::Rng;
use tracing::{info, warn};

use crate::domain::models::{
    auth::Identity,
    booking::{Booking, BookingStatus, NewBookingParams, BLOCKED_ATTENDEE_EMAIL, BLOCKED_ATTENDEE_NAME, BLOCKED_TITLE},
    event_type::{slugify, EventType, EventTypeWithHosts, NewEventTypeParams, LOCATION_MIROTALK},
    job::{self, Job},
    schedule::ScheduleWindow,
    user::User,
};
use crate::domain::services::{
    availability::{self, HostAvailability},
    calendar_sync,
    host_selection::{candidate_hosts, select_host},
    notification_service::{self, NotificationKind},
    subscription::{get_plan_by_id, Feature, Plan},
};
use crate::error::AppError;
use crate::state::AppState;

pub const REMINDER_LEAD_HOURS: i64 = 24;
const MANUAL_LOCATION: &str = "google_meet";

/// Schedules, users and blocking bookings of a set of hosts for one range.
pub struct HostSnapshot {
    pub hosts: Vec<User>,
    pub windows: Vec<ScheduleWindow>,
    pub bookings: Vec<Booking>,
}

impl HostSnapshot {
    pub async fn load(state: &AppState, host_ids: &[String], start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, AppError> {
        let mut hosts = Vec::with_capacity(host_ids.len());
        for id in host_ids {
            match state.user_repo.find_by_id(id).await? {
                Some(user) => hosts.push(user),
                None => warn!(host_id = %id, "Assigned host no longer exists"),
            }
        }

        let ids: Vec<String> = hosts.iter().map(|h| h.id.clone()).collect();
        let windows = state.schedule_repo.list_for_users(&ids).await?;
        let bookings = state.booking_repo.list_blocking_for_hosts(&ids, start, end).await?;

        Ok(Self { hosts, windows, bookings })
    }

    pub fn availability(&self) -> Vec<HostAvailability<'_>> {
        self.hosts
            .iter()
            .map(|h| HostAvailability::new(&h.id, &h.timezone, &self.windows, &self.bookings))
            .collect()
    }

    /// Hosts whose own slot set for the local date contains `start`.
    pub fn hosts_offering(&self, start: DateTime<Utc>, duration: Duration, now: DateTime<Utc>) -> Vec<String> {
        self.availability()
            .iter()
            .filter(|h| {
                let date = start.with_timezone(&h.timezone).date_naive();
                h.day_slots(date, duration, now).contains(&start)
            })
            .map(|h| h.host_id.to_string())
            .collect()
    }
}

pub async fn find_event_type(state: &AppState, id: &str) -> Result<EventTypeWithHosts, AppError> {
    state.event_type_repo.find_by_id(id).await?
        .ok_or(AppError::NotFound("Event type not found".into()))
}

pub async fn organization_plan(state: &AppState, organization_id: &str) -> Result<Plan, AppError> {
    let organization = state.organization_repo.find_by_id(organization_id).await?
        .ok_or(AppError::NotFound("Organization not found".into()))?;
    Ok(get_plan_by_id(Some(&organization.subscription_plan)))
}

fn duration_of(event_type: &EventType) -> Duration {
    Duration::minutes(event_type.duration_minutes as i64)
}

pub async fn day_slots_for_event(
    state: &AppState,
    event_type_id: &str,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>, AppError> {
    let event_type = find_event_type(state, event_type_id).await?;
    let (start, end) = availability::day_query_range(date);
    let snapshot = HostSnapshot::load(state, &candidate_hosts(&event_type), start, end).await?;

    Ok(availability::day_slots(&snapshot.availability(), date, duration_of(&event_type.event_type), now))
}

pub async fn month_days_for_event(
    state: &AppState,
    event_type_id: &str,
    year: i32,
    month: u32,
    now: DateTime<Utc>,
) -> Result<Vec<NaiveDate>, AppError> {
    let event_type = find_event_type(state, event_type_id).await?;
    let (start, end) = availability::month_query_range(year, month)
        .ok_or(AppError::Validation("Invalid month".into()))?;
    let snapshot = HostSnapshot::load(state, &candidate_hosts(&event_type), start, end).await?;

    Ok(availability::month_available_days(
        &snapshot.availability(),
        year,
        month,
        duration_of(&event_type.event_type),
        now,
    ))
}

/// UTC bounds of the calendar month containing `now`.
pub fn current_month_range(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now);
    let (y, m) = if now.month() == 12 { (now.year() + 1, 1) } else { (now.year(), now.month() + 1) };
    let end = Utc.with_ymd_and_hms(y, m, 1, 0, 0, 0).single().unwrap_or(now);
    (start, end)
}

pub fn meeting_url_for(event_type: &EventType, mirotalk_url: &str) -> Option<String> {
    if event_type.location_type != LOCATION_MIROTALK {
        return None;
    }
    let room: [u8; 8] = rand::random();
    Some(format!("{}/join/{}", mirotalk_url.trim_end_matches('/'), hex::encode(room)))
}

/// Confirmation now, reminder a day ahead when that is still in the future.
pub fn notification_jobs(booking: &Booking, first: NotificationKind, now: DateTime<Utc>) -> Vec<Job> {
    let mut jobs = vec![Job::new(first.job_type(), booking.id.clone(), booking.organization_id.clone(), now)];
    let remind_at = booking.start_time - Duration::hours(REMINDER_LEAD_HOURS);
    if remind_at > now {
        jobs.push(Job::new(job::JOB_REMINDER, booking.id.clone(), booking.organization_id.clone(), remind_at));
    }
    jobs
}

async fn ensure_booking_quota(state: &AppState, plan: &Plan, host_id: &str, now: DateTime<Utc>) -> Result<(), AppError> {
    let (month_start, month_end) = current_month_range(now);
    let used = state.booking_repo.count_for_host_between(host_id, month_start, month_end).await?;
    if !plan.within_limit(Feature::BookingsPerMonth, used) {
        return Err(AppError::LimitReached(plan.limit_message(Feature::BookingsPerMonth)));
    }
    Ok(())
}

async fn attach_calendar_event(state: &AppState, plan: &Plan, event_type: &EventType, mut booking: Booking) -> Booking {
    if !plan.has_feature(Feature::CalendarIntegrations) {
        return booking;
    }
    let Some(event_id) = calendar_sync::push_created(state.calendar_service.as_ref(), event_type, &booking).await else {
        return booking;
    };
    booking.calendar_event_id = Some(event_id);
    match state.booking_repo.update(&booking).await {
        Ok(updated) => updated,
        Err(e) => {
            warn!(booking_id = %booking.id, error = %e, "Failed to store calendar event id");
            booking
        }
    }
}

pub struct PublicBookingInput {
    pub event_type_id: String,
    pub start_time: DateTime<Utc>,
    pub attendee_name: String,
    pub attendee_email: String,
    pub attendee_phone: Option<String>,
    pub attendee_notes: Option<String>,
}

pub fn validate_attendee(name: &str, email: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Attendee name is required".into()));
    }
    let email = email.trim();
    if email.len() < 3 || !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(AppError::Validation("Invalid attendee email".into()));
    }
    Ok(())
}

pub async fn create_public_booking<R: Rng + Send>(
    state: &AppState,
    input: PublicBookingInput,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Booking, AppError> {
    validate_attendee(&input.attendee_name, &input.attendee_email)?;

    let event_type = find_event_type(state, &input.event_type_id).await?;
    let et = &event_type.event_type;
    let start = input.start_time;
    if start < now {
        return Err(AppError::Validation("Cannot book in the past".into()));
    }
    let duration = duration_of(et);
    let end = start + duration;

    let (range_start, range_end) = availability::day_query_range(start.date_naive());
    let snapshot = HostSnapshot::load(state, &candidate_hosts(&event_type), range_start, range_end).await?;

    let mut remaining = snapshot.hosts_offering(start, duration, now);
    if remaining.is_empty() {
        warn!(event_type_id = %et.id, start = %start, "Requested slot is not offered by any host");
        return Err(AppError::Conflict("Selected time slot is not available".into()));
    }

    let plan = organization_plan(state, &et.organization_id).await?;

    loop {
        let Some(host_id) = select_host(&remaining, &snapshot.bookings, start, end, rng) else {
            return Err(AppError::Conflict("No host is available for the selected time".into()));
        };

        ensure_booking_quota(state, &plan, &host_id, now).await?;

        if plan.has_feature(Feature::CalendarIntegrations)
            && calendar_sync::is_busy_fail_open(
                state.calendar_service.as_ref(),
                &host_id,
                start,
                end,
                state.config.calendar_check_timeout(),
            ).await
        {
            info!(host_id = %host_id, "Host busy in external calendar, trying another host");
            remaining.retain(|h| h != &host_id);
            continue;
        }

        let booking = Booking::new(NewBookingParams {
            organization_id: et.organization_id.clone(),
            event_type_id: et.id.clone(),
            host_id: host_id.clone(),
            start,
            end,
            attendee_name: input.attendee_name.trim().to_string(),
            attendee_email: input.attendee_email.trim().to_string(),
            attendee_phone: input.attendee_phone.clone().filter(|p| !p.is_empty()),
            attendee_notes: input.attendee_notes.clone(),
            status: BookingStatus::Confirmed,
            meeting_url: meeting_url_for(et, &state.config.mirotalk_url),
        });
        let jobs = notification_jobs(&booking, NotificationKind::Confirmation, now);

        match state.booking_repo.create_if_free(&booking, jobs).await? {
            Some(created) => {
                info!(booking_id = %created.id, host_id = %host_id, event_type_id = %et.id, "Booking confirmed");
                return Ok(attach_calendar_event(state, &plan, et, created).await);
            }
            None => {
                warn!(host_id = %host_id, start = %start, "Slot taken concurrently, trying another host");
                remaining.retain(|h| h != &host_id);
            }
        }
    }
}

pub struct ManualBookingInput {
    pub title: String,
    pub host_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attendee_name: String,
    pub attendee_email: String,
    pub attendee_phone: Option<String>,
    pub attendee_notes: Option<String>,
    pub status: Option<BookingStatus>,
}

async fn find_or_create_manual_event_type(
    state: &AppState,
    host: &User,
    title: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<EventType, AppError> {
    let slug = slugify(title);
    if let Some(existing) = state.event_type_repo.find_by_owner_slug(&host.id, &slug).await? {
        return Ok(existing);
    }

    let minutes = (end - start).num_minutes();
    let event_type = EventType::new(NewEventTypeParams {
        organization_id: host.organization_id.clone(),
        owner_id: host.id.clone(),
        title: title.trim().to_string(),
        slug,
        description: None,
        duration_minutes: if minutes > 0 { minutes as i32 } else { 60 },
        location_type: MANUAL_LOCATION.to_string(),
    });
    let created = state.event_type_repo.create(&event_type, &[]).await?;
    info!(event_type_id = %created.event_type.id, "Created event type for manual booking");
    Ok(created.event_type)
}

pub async fn create_manual_booking(
    state: &AppState,
    actor: &Identity,
    mut input: ManualBookingInput,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    let status = input.status.unwrap_or(BookingStatus::Confirmed);
    let blocked = status == BookingStatus::Blocked;
    if blocked {
        fill_blank(&mut input.title, BLOCKED_TITLE);
        fill_blank(&mut input.attendee_name, BLOCKED_ATTENDEE_NAME);
        fill_blank(&mut input.attendee_email, BLOCKED_ATTENDEE_EMAIL);
    }

    if input.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".into()));
    }
    if input.end_time <= input.start_time {
        return Err(AppError::Validation("End time must be after start time".into()));
    }
    validate_attendee(&input.attendee_name, &input.attendee_email)?;

    let host_id = input.host_id.clone().unwrap_or_else(|| actor.user_id.clone());
    let host = state.user_repo.find_by_id(&host_id).await?
        .filter(|h| h.organization_id == actor.organization_id)
        .ok_or(AppError::NotFound("Host not found".into()))?;
    if !actor.can_manage(&host.id) {
        return Err(AppError::Forbidden("Only organization admins can book for other members".into()));
    }

    let plan = organization_plan(state, &host.organization_id).await?;
    if !blocked {
        ensure_booking_quota(state, &plan, &host.id, now).await?;
    }

    let event_type = find_or_create_manual_event_type(state, &host, &input.title, input.start_time, input.end_time).await?;

    let booking = Booking::new(NewBookingParams {
        organization_id: host.organization_id.clone(),
        event_type_id: event_type.id.clone(),
        host_id: host.id.clone(),
        start: input.start_time,
        end: input.end_time,
        attendee_name: input.attendee_name.trim().to_string(),
        attendee_email: input.attendee_email.trim().to_string(),
        attendee_phone: input.attendee_phone.filter(|p| !p.is_empty()),
        attendee_notes: input.attendee_notes,
        status,
        meeting_url: if blocked { None } else { meeting_url_for(&event_type, &state.config.mirotalk_url) },
    });
    let jobs = if status == BookingStatus::Confirmed {
        notification_jobs(&booking, NotificationKind::Confirmation, now)
    } else {
        Vec::new()
    };

    let created = state.booking_repo.create_if_free(&booking, jobs).await?
        .ok_or(AppError::Conflict("Selected host is already booked for this time slot".into()))?;
    info!(booking_id = %created.id, host_id = %host.id, status = %created.status, "Manual booking created");

    if blocked {
        return Ok(created);
    }
    Ok(attach_calendar_event(state, &plan, &event_type, created).await)
}

fn fill_blank(field: &mut String, default: &str) {
    if field.trim().is_empty() {
        *field = default.to_string();
    }
}

#[derive(Default)]
pub struct BookingChanges {
    pub start_time: Option<DateTime<Utc>>,
    pub attendee_name: Option<String>,
    pub attendee_email: Option<String>,
    pub attendee_phone: Option<String>,
    pub attendee_notes: Option<String>,
    /// `Some(None)` clears the link.
    pub meeting_url: Option<Option<String>>,
    pub status: Option<BookingStatus>,
}

/// Loads a booking the caller is allowed to change.
pub async fn find_managed_booking(state: &AppState, actor: &Identity, booking_id: &str) -> Result<Booking, AppError> {
    let booking = state.booking_repo.find_by_id(booking_id).await?
        .filter(|b| b.organization_id == actor.organization_id)
        .ok_or(AppError::NotFound("Booking not found".into()))?;
    if !actor.can_manage(&booking.host_id) {
        return Err(AppError::Forbidden("Only the host or an organization admin can change this booking".into()));
    }
    Ok(booking)
}

fn notification_for(changes: &BookingChanges, updated: &Booking) -> Option<NotificationKind> {
    if changes.status == Some(BookingStatus::Cancelled) {
        Some(NotificationKind::Cancellation)
    } else if changes.start_time.is_some() {
        Some(NotificationKind::Reschedule)
    } else if matches!(changes.meeting_url, Some(Some(_))) && updated.meeting_url.is_some() {
        Some(NotificationKind::MeetingLink)
    } else if changes.attendee_name.is_some() || changes.attendee_email.is_some() || changes.attendee_notes.is_some() {
        Some(NotificationKind::Update)
    } else {
        None
    }
}

pub async fn update_booking(
    state: &AppState,
    actor: &Identity,
    booking_id: &str,
    changes: BookingChanges,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    let current = find_managed_booking(state, actor, booking_id).await?;
    let event_type = state.event_type_repo.find_by_id(&current.event_type_id).await?
        .ok_or(AppError::NotFound("Event type not found".into()))?
        .event_type;

    let mut next = current.clone();
    if let Some(name) = &changes.attendee_name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Attendee name cannot be empty".into()));
        }
        next.attendee_name = name.trim().to_string();
    }
    if let Some(email) = &changes.attendee_email {
        validate_attendee(&next.attendee_name, email)?;
        next.attendee_email = email.trim().to_string();
    }
    if let Some(phone) = &changes.attendee_phone {
        next.attendee_phone = Some(phone.clone()).filter(|p| !p.is_empty());
    }
    if let Some(notes) = &changes.attendee_notes {
        next.attendee_notes = Some(notes.clone());
    }
    if let Some(url) = &changes.meeting_url {
        let url = url.clone().filter(|u| !u.is_empty());
        if let Some(u) = &url
            && !(u.starts_with("http://") || u.starts_with("https://")) {
            return Err(AppError::Validation("Meeting URL must be an http(s) link".into()));
        }
        next.meeting_url = url;
    }
    if let Some(status) = changes.status {
        next.status = status.as_str().to_string();
    }

    let plan = organization_plan(state, &current.organization_id).await?;
    let reactivated = !current.blocks_time() && next.blocks_time();
    let was_confirmed = current.status == BookingStatus::Confirmed.as_str();
    let now_confirmed = next.status == BookingStatus::Confirmed.as_str();

    let updated = if let Some(new_start) = changes.start_time {
        if new_start < now {
            return Err(AppError::Validation("Cannot reschedule into the past".into()));
        }
        let new_end = new_start + duration_of(&event_type);

        if plan.has_feature(Feature::CalendarIntegrations)
            && calendar_sync::is_busy_fail_open(
                state.calendar_service.as_ref(),
                &current.host_id,
                new_start,
                new_end,
                state.config.calendar_check_timeout(),
            ).await
        {
            return Err(AppError::Conflict("Selected time slot conflicts with calendar events".into()));
        }

        next.start_time = new_start;
        next.end_time = new_end;
        let jobs = if now_confirmed {
            notification_jobs(&next, NotificationKind::Reschedule, now)
        } else {
            Vec::new()
        };
        state.booking_repo.reschedule_if_free(&next, new_start, new_end, jobs).await?
            .ok_or(AppError::Conflict("Time slot already booked".into()))?
    } else if reactivated {
        let jobs = if now_confirmed {
            notification_jobs(&next, NotificationKind::Confirmation, now)
        } else {
            Vec::new()
        };
        state.booking_repo.reschedule_if_free(&next, next.start_time, next.end_time, jobs).await?
            .ok_or(AppError::Conflict("Time slot already booked".into()))?
    } else {
        let updated = state.booking_repo.update(&next).await?;
        if !was_confirmed && now_confirmed {
            for job in notification_jobs(&updated, NotificationKind::Confirmation, now) {
                if let Err(e) = state.job_repo.create(&job).await {
                    warn!(booking_id = %updated.id, error = %e, "Failed to enqueue notification");
                }
            }
        }
        updated
    };

    info!(booking_id = %updated.id, status = %updated.status, "Booking updated");

    // Reminders and follow-ups belong to confirmed bookings only.
    if was_confirmed && !now_confirmed
        && let Err(e) = state.job_repo.cancel_jobs_for_booking(&updated.id).await {
        warn!(booking_id = %updated.id, error = %e, "Failed to cancel pending jobs");
    }

    let follow_up = match notification_for(&changes, &updated) {
        Some(NotificationKind::Cancellation) if was_confirmed => Some(NotificationKind::Cancellation),
        Some(NotificationKind::Cancellation) | Some(NotificationKind::Reschedule) => None,
        Some(kind) if was_confirmed && now_confirmed => Some(kind),
        _ => None,
    };
    if let Some(kind) = follow_up {
        let job = Job::new(kind.job_type(), updated.id.clone(), updated.organization_id.clone(), now);
        if let Err(e) = state.job_repo.create(&job).await {
            warn!(booking_id = %updated.id, error = %e, "Failed to enqueue notification");
        }
    }

    if plan.has_feature(Feature::CalendarIntegrations) {
        if updated.blocks_time() {
            calendar_sync::push_updated(state.calendar_service.as_ref(), &event_type, &updated).await;
        } else if current.blocks_time() {
            calendar_sync::push_deleted(state.calendar_service.as_ref(), &updated).await;
        }
    }

    Ok(updated)
}

pub async fn delete_booking(state: &AppState, actor: &Identity, booking_id: &str) -> Result<(), AppError> {
    let booking = find_managed_booking(state, actor, booking_id).await?;
    let event_type = state.event_type_repo.find_by_id(&booking.event_type_id).await?;
    let host = state.user_repo.find_by_id(&booking.host_id).await?;

    state.job_repo.cancel_jobs_for_booking(&booking.id).await?;
    state.booking_repo.delete(&booking.id).await?;
    info!(booking_id = %booking.id, "Booking deleted");

    let plan = organization_plan(state, &booking.organization_id).await?;
    if plan.has_feature(Feature::CalendarIntegrations) {
        calendar_sync::push_deleted(state.calendar_service.as_ref(), &booking).await;
    }

    if booking.status == BookingStatus::Confirmed.as_str()
        && let (Some(event_type), Some(host)) = (event_type, host) {
        notification_service::spawn_best_effort(
            state.email_service.clone(),
            state.templates.clone(),
            NotificationKind::Cancellation,
            booking,
            event_type.event_type,
            host,
            state.config.public_base_url.clone(),
        );
    }

    Ok(())
}

/// `.ics` body for a booking together with its suggested file name.
pub async fn booking_ics(state: &AppState, booking_id: &str) -> Result<(String, String), AppError> {
    let booking = state.booking_repo.find_by_id(booking_id).await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;
    let event_type = state.event_type_repo.find_by_id(&booking.event_type_id).await?
        .ok_or(AppError::NotFound("Event type not found".into()))?;
    let host = state.user_repo.find_by_id(&booking.host_id).await?
        .ok_or(AppError::NotFound("Host not found".into()))?;

    let ics = crate::domain::services::calendar::generate_ics(&event_type.event_type, &booking, &host);
    Ok((ics, format!("booking-{}.ics", booking.id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_month_range() {
        let now = Utc.with_ymd_and_hms(2030, 12, 15, 10, 0, 0).unwrap();
        let (start, end) = current_month_range(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2030, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_validate_attendee() {
        assert!(validate_attendee("Ann", "ann@example.com").is_ok());
        assert!(validate_attendee(" ", "ann@example.com").is_err());
        assert!(validate_attendee("Ann", "not-an-email").is_err());
        assert!(validate_attendee("Ann", "@example.com").is_err());
    }

    #[test]
    fn test_reminder_only_when_far_enough_ahead() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let mk = |start: DateTime<Utc>| Booking::new(NewBookingParams {
            organization_id: "org".into(),
            event_type_id: "evt".into(),
            host_id: "h".into(),
            start,
            end: start + Duration::minutes(30),
            attendee_name: "A".into(),
            attendee_email: "a@example.com".into(),
            attendee_phone: None,
            attendee_notes: None,
            status: BookingStatus::Confirmed,
            meeting_url: None,
        });

        let soon = notification_jobs(&mk(now + Duration::hours(3)), NotificationKind::Confirmation, now);
        assert_eq!(soon.len(), 1);
        assert_eq!(soon[0].job_type, job::JOB_CONFIRMATION);

        let later = notification_jobs(&mk(now + Duration::days(3)), NotificationKind::Confirmation, now);
        assert_eq!(later.len(), 2);
        assert_eq!(later[1].job_type, job::JOB_REMINDER);
        assert_eq!(later[1].execute_at, now + Duration::days(2));
    }
}
