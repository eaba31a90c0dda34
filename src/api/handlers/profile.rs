use axum::{extract::State, response::IntoResponse, Json};
use crate::api::dtos::requests::UpdateProfileRequest;
use crate::api::extractors::{auth::AuthUser, org::OrgId};
use crate::error::AppError;
use crate::state::AppState;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::info;

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    let user = state.user_repo.find_by_id(&auth.0.user_id).await?
        .ok_or(AppError::NotFound("User not found".into()))?;
    let tags = state.tag_repo.list_for_user(&user.id).await?;

    Ok(Json(serde_json::json!({
        "user": user,
        "tags": tags,
    })))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    let mut user = state.user_repo.find_by_id(&auth.0.user_id).await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Name cannot be empty".into()));
        }
        user.name = name.trim().to_string();
    }
    if let Some(tz) = payload.timezone {
        if tz.parse::<Tz>().is_err() {
            return Err(AppError::Validation("Invalid timezone".into()));
        }
        user.timezone = tz;
    }

    let updated = state.user_repo.update_profile(&user).await?;
    info!("Profile updated for {}", updated.id);
    Ok(Json(updated))
}
