use axum::{extract::{Query, State}, response::IntoResponse, Json};
use crate::api::dtos::requests::{ReplaceScheduleRequest, ScheduleEntry, ScheduleQuery};
use crate::api::extractors::{auth::AuthUser, org::OrgId};
use crate::domain::models::{auth::Identity, schedule::{ClockRange, ScheduleWindow}, user::User};
use crate::error::AppError;
use crate::state::AppState;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Resolves the user whose schedule is addressed and checks the caller may edit it.
async fn target_user(state: &AppState, actor: &Identity, user_id: Option<String>) -> Result<User, AppError> {
    let user_id = user_id.unwrap_or_else(|| actor.user_id.clone());
    let user = state.user_repo.find_by_id(&user_id).await?
        .filter(|u| u.organization_id == actor.organization_id)
        .ok_or(AppError::NotFound("User not found".into()))?;
    if !actor.can_manage(&user.id) {
        return Err(AppError::Forbidden("Only organization admins can manage other schedules".into()));
    }
    Ok(user)
}

pub fn validate_entries(entries: &[ScheduleEntry]) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for entry in entries {
        if !(0..=6).contains(&entry.day) {
            return Err(AppError::Validation(format!("Invalid day {}: expected 0 (Sunday) to 6", entry.day)));
        }
        if !seen.insert(entry.day) {
            return Err(AppError::Validation(format!("Duplicate window for day {}", entry.day)));
        }
        let range = ClockRange::parse(&entry.start_time, &entry.end_time)
            .ok_or(AppError::Validation("Times must use HH:MM".into()))?;
        if range.start >= range.end {
            return Err(AppError::Validation("Start time must be before end time".into()));
        }
    }
    Ok(())
}

pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
    Query(query): Query<ScheduleQuery>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    let user = target_user(&state, &auth.0, query.user_id).await?;
    let windows = state.schedule_repo.list_for_user(&user.id).await?;
    Ok(Json(windows))
}

pub async fn replace_schedule(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
    Json(payload): Json<ReplaceScheduleRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    let user = target_user(&state, &auth.0, payload.user_id).await?;
    validate_entries(&payload.schedules)?;

    let windows: Vec<ScheduleWindow> = payload.schedules
        .into_iter()
        .map(|e| ScheduleWindow::new(user.id.clone(), e.day, e.start_time, e.end_time))
        .collect();
    let saved = state.schedule_repo.replace_for_user(&user.id, &windows).await?;

    info!(user_id = %user.id, windows = saved.len(), "Schedule replaced");
    Ok(Json(saved))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(day: i32, start: &str, end: &str) -> ScheduleEntry {
        ScheduleEntry { day, start_time: start.into(), end_time: end.into() }
    }

    #[test]
    fn test_schedule_validation() {
        assert!(validate_entries(&[entry(1, "09:00", "17:00"), entry(0, "10:00", "12:00")]).is_ok());
        assert!(validate_entries(&[]).is_ok());
        assert!(validate_entries(&[entry(7, "09:00", "17:00")]).is_err());
        assert!(validate_entries(&[entry(1, "17:00", "09:00")]).is_err());
        assert!(validate_entries(&[entry(1, "09:00", "09:00")]).is_err());
        assert!(validate_entries(&[entry(1, "9am", "17:00")]).is_err());
        assert!(validate_entries(&[entry(2, "09:00", "12:00"), entry(2, "13:00", "17:00")]).is_err());
    }
}
