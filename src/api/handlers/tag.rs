use axum::{extract::{State, Path}, response::IntoResponse, Json, http::StatusCode};
use crate::state::AppState;
use crate::api::dtos::requests::{CreateTagRequest, UpdateTagRequest};
use crate::api::extractors::{auth::AuthUser, org::OrgId};
use crate::domain::models::tag::Tag;
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

fn validate_color(color: &str) -> Result<(), AppError> {
    let hex = color.strip_prefix('#').unwrap_or("");
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::Validation("Color must be a #rrggbb value".into()));
    }
    Ok(())
}

async fn find_tag(state: &AppState, org_id: &str, tag_id: &str) -> Result<Tag, AppError> {
    state.tag_repo.find_by_id(tag_id).await?
        .filter(|t| t.organization_id == org_id)
        .ok_or(AppError::NotFound("Tag not found".into()))
}

pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    let tags = state.tag_repo.list(&org_id).await?;
    Ok(Json(tags))
}

pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
    Json(payload): Json<CreateTagRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin(&org_id)?;
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("Tag name is required".into()));
    }
    if let Some(color) = &payload.color {
        validate_color(color)?;
    }

    let tag = Tag::new(org_id, payload.name.trim().to_string(), payload.color);
    let created = state.tag_repo.create(&tag).await?;
    info!("Tag created: {}", created.id);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_tag(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
    Path((_, tag_id)): Path<(String, String)>,
    Json(payload): Json<UpdateTagRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin(&org_id)?;
    let mut tag = find_tag(&state, &org_id, &tag_id).await?;

    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Tag name cannot be empty".into()));
        }
        tag.name = name.trim().to_string();
    }
    if let Some(color) = payload.color {
        validate_color(&color)?;
        tag.color = color;
    }

    let updated = state.tag_repo.update(&tag).await?;
    Ok(Json(updated))
}

pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
    Path((_, tag_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin(&org_id)?;
    state.tag_repo.delete(&org_id, &tag_id).await?;
    info!("Tag deleted: {}", tag_id);
    Ok(Json(serde_json::json!({"status": "deleted"})))
}

pub async fn list_member_tags(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
    Path((_, user_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    let tags = state.tag_repo.list_for_user(&user_id).await?;
    Ok(Json(tags.into_iter().filter(|t| t.organization_id == org_id).collect::<Vec<_>>()))
}

pub async fn assign_tag(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
    Path((_, user_id, tag_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin(&org_id)?;
    let tag = find_tag(&state, &org_id, &tag_id).await?;
    state.user_repo.find_by_id(&user_id).await?
        .filter(|u| u.organization_id == org_id)
        .ok_or(AppError::NotFound("User not found".into()))?;

    state.tag_repo.assign(&user_id, &tag.id).await?;
    Ok(Json(serde_json::json!({"status": "assigned"})))
}

pub async fn unassign_tag(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
    Path((_, user_id, tag_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin(&org_id)?;
    let tag = find_tag(&state, &org_id, &tag_id).await?;
    state.tag_repo.unassign(&user_id, &tag.id).await?;
    Ok(Json(serde_json::json!({"status": "unassigned"})))
}
