use axum::{extract::{Query, State}, response::IntoResponse, Json};
use crate::api::dtos::{
    requests::{DayAvailabilityQuery, MonthAvailabilityQuery},
    responses::{MonthAvailabilityResponse, SlotsResponse},
};
use crate::domain::services::{availability::parse_month, booking_service};
use crate::error::AppError;
use crate::state::AppState;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

pub async fn get_day_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DayAvailabilityQuery>,
) -> Result<impl IntoResponse, AppError> {
    let date = NaiveDate::parse_from_str(&query.date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Invalid date format (YYYY-MM-DD)".into()))?;
    let display_tz = match &query.tz {
        Some(raw) => Some(raw.parse::<Tz>().map_err(|_| AppError::Validation("Invalid timezone".into()))?),
        None => None,
    };

    let slots = booking_service::day_slots_for_event(&state, &query.event_type_id, date, Utc::now()).await?;
    let local_slots = display_tz.map(|tz| {
        slots.iter().map(|s| s.with_timezone(&tz).to_rfc3339()).collect()
    });

    Ok(Json(SlotsResponse { date: query.date, slots, local_slots }))
}

pub async fn get_month_days(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MonthAvailabilityQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (year, month) = parse_month(&query.month)
        .ok_or(AppError::Validation("Invalid month format (YYYY-MM)".into()))?;

    let days = booking_service::month_days_for_event(&state, &query.event_type_id, year, month, Utc::now()).await?;

    Ok(Json(MonthAvailabilityResponse {
        month: query.month,
        available_days: days.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect(),
    }))
}
