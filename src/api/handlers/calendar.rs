use axum::{extract::State, response::IntoResponse, Json};
use crate::api::dtos::{requests::CalendarTokenRequest, responses::CalendarStatusResponse};
use crate::api::extractors::{auth::AuthUser, org::OrgId};
use crate::error::AppError;
use crate::state::AppState;
use std::sync::Arc;
use tracing::info;

const PROVIDER: &str = "google";

pub async fn get_google_status(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    let user = state.user_repo.find_by_id(&auth.0.user_id).await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    Ok(Json(CalendarStatusResponse {
        provider: PROVIDER,
        connected: user.calendar_access_token.is_some_and(|t| !t.is_empty()),
    }))
}

/// Stores (or with `null`, removes) the caller's calendar access token.
pub async fn put_google_token(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
    Json(payload): Json<CalendarTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    let token = payload.access_token.filter(|t| !t.trim().is_empty());
    state.user_repo.set_calendar_token(&auth.0.user_id, token.as_deref()).await?;

    info!(user_id = %auth.0.user_id, connected = token.is_some(), "Calendar token updated");
    Ok(Json(CalendarStatusResponse { provider: PROVIDER, connected: token.is_some() }))
}
