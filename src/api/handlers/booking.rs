use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use crate::api::dtos::requests::{BookingRangeQuery, CreateBookingRequest, ManualBookingRequest, UpdateBookingRequest};
use crate::api::extractors::{auth::AuthUser, org::OrgId};
use crate::domain::services::booking_service::{
    self, BookingChanges, ManualBookingInput, PublicBookingInput,
};
use crate::error::AppError;
use crate::state::AppState;
use chrono::{Duration, Utc};
use rand::{rngs::StdRng, SeedableRng};
use std::sync::Arc;

const DEFAULT_LOOKBACK_DAYS: i64 = 30;
const DEFAULT_LOOKAHEAD_DAYS: i64 = 90;

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let input = PublicBookingInput {
        event_type_id: payload.event_type_id,
        start_time: payload.start_time,
        attendee_name: payload.attendee_name,
        attendee_email: payload.attendee_email,
        attendee_phone: payload.attendee_phone,
        attendee_notes: payload.attendee_notes,
    };
    let mut rng = StdRng::from_entropy();
    let booking = booking_service::create_public_booking(&state, input, Utc::now(), &mut rng).await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn create_manual_booking(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
    Json(payload): Json<ManualBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    let input = ManualBookingInput {
        title: payload.title,
        host_id: payload.host_id,
        start_time: payload.start_time,
        end_time: payload.end_time,
        attendee_name: payload.attendee_name,
        attendee_email: payload.attendee_email,
        attendee_phone: payload.attendee_phone,
        attendee_notes: payload.attendee_notes,
        status: payload.status,
    };
    let booking = booking_service::create_manual_booking(&state, &auth.0, input, Utc::now()).await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
    Query(range): Query<BookingRangeQuery>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    let now = Utc::now();
    let start = range.start.unwrap_or(now - Duration::days(DEFAULT_LOOKBACK_DAYS));
    let end = range.end.unwrap_or(now + Duration::days(DEFAULT_LOOKAHEAD_DAYS));
    if end <= start {
        return Err(AppError::Validation("end must be after start".into()));
    }

    let bookings = if auth.0.is_org_admin() {
        state.booking_repo.list_by_organization(&org_id, start, end).await?
    } else {
        state.booking_repo.list_by_host(&auth.0.user_id, start, end).await?
    };
    Ok(Json(bookings))
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
    Path((_, booking_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    let booking = booking_service::find_managed_booking(&state, &auth.0, &booking_id).await?;
    Ok(Json(booking))
}

pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
    Path((_, booking_id)): Path<(String, String)>,
    Json(payload): Json<UpdateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    let changes = BookingChanges {
        start_time: payload.start_time,
        attendee_name: payload.attendee_name,
        attendee_email: payload.attendee_email,
        attendee_phone: payload.attendee_phone,
        attendee_notes: payload.attendee_notes,
        meeting_url: payload.meeting_url,
        status: payload.status,
    };
    let updated = booking_service::update_booking(&state, &auth.0, &booking_id, changes, Utc::now()).await?;
    Ok(Json(updated))
}

pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
    Path((_, booking_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    booking_service::delete_booking(&state, &auth.0, &booking_id).await?;
    Ok(Json(serde_json::json!({"status": "deleted"})))
}

pub async fn get_booking_ical(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (ics, filename) = booking_service::booking_ics(&state, &booking_id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        ics,
    ))
}
