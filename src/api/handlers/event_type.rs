use axum::{extract::{Path, State}, response::IntoResponse, Json, http::StatusCode};
use crate::api::dtos::{
    requests::{CreateEventTypeRequest, UpdateEventTypeRequest},
    responses::{PublicEventTypeResponse, PublicHost},
};
use crate::api::extractors::{auth::AuthUser, org::OrgId};
use crate::domain::models::booking::BLOCKED_TITLE;
use crate::domain::models::event_type::{slugify, EventType, EventTypeWithHosts, NewEventTypeParams, LOCATION_MIROTALK};
use crate::domain::services::booking_service::organization_plan;
use crate::domain::services::subscription::Feature;
use crate::error::AppError;
use crate::state::AppState;
use std::sync::Arc;
use tracing::info;

async fn validate_hosts(state: &AppState, org_id: &str, host_ids: &[String]) -> Result<(), AppError> {
    for id in host_ids {
        let member = state.user_repo.find_by_id(id).await?
            .is_some_and(|u| u.organization_id == org_id);
        if !member {
            return Err(AppError::Validation(format!("Host {} is not a member of this organization", id)));
        }
    }
    Ok(())
}

fn validate_slug(slug: &str) -> Result<(), AppError> {
    let ok = !slug.is_empty() && slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !ok {
        return Err(AppError::Validation("Slug may only contain a-z, 0-9 and '-'".into()));
    }
    Ok(())
}

async fn find_in_org(state: &AppState, org_id: &str, id: &str) -> Result<EventTypeWithHosts, AppError> {
    state.event_type_repo.find_by_id(id).await?
        .filter(|et| et.event_type.organization_id == org_id)
        .ok_or(AppError::NotFound("Event type not found".into()))
}

pub async fn create_event_type(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
    Json(payload): Json<CreateEventTypeRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".into()));
    }
    if payload.duration_minutes < 1 {
        return Err(AppError::Validation("Duration must be at least 1 minute".into()));
    }
    let slug = payload.slug.unwrap_or_else(|| slugify(&payload.title));
    validate_slug(&slug)?;

    let plan = organization_plan(&state, &org_id).await?;
    let owned = state.event_type_repo.count_by_owner(&auth.0.user_id).await?;
    if !plan.within_limit(Feature::EventTypes, owned) {
        return Err(AppError::LimitReached(plan.limit_message(Feature::EventTypes)));
    }

    let host_ids = payload.host_ids.unwrap_or_default();
    validate_hosts(&state, &org_id, &host_ids).await?;

    let event_type = EventType::new(NewEventTypeParams {
        organization_id: org_id.clone(),
        owner_id: auth.0.user_id.clone(),
        title: payload.title.trim().to_string(),
        slug,
        description: payload.description,
        duration_minutes: payload.duration_minutes,
        location_type: payload.location_type.unwrap_or_else(|| LOCATION_MIROTALK.to_string()),
    });
    let created = state.event_type_repo.create(&event_type, &host_ids).await?;

    info!(event_type_id = %created.event_type.id, "Event type created: {}", created.event_type.slug);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_event_types(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    let event_types = state.event_type_repo.list_by_organization(&org_id).await?;
    Ok(Json(event_types))
}

pub async fn get_event_type(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
    Path((_, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    Ok(Json(find_in_org(&state, &org_id, &id).await?))
}

pub async fn update_event_type(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
    Path((_, id)): Path<(String, String)>,
    Json(payload): Json<UpdateEventTypeRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    let mut current = find_in_org(&state, &org_id, &id).await?.event_type;
    if !auth.0.can_manage(&current.owner_id) {
        return Err(AppError::Forbidden("Only the owner or an organization admin can edit this event type".into()));
    }

    if let Some(val) = payload.title {
        if val.trim().is_empty() {
            return Err(AppError::Validation("Title cannot be empty".into()));
        }
        current.title = val.trim().to_string();
    }
    if let Some(val) = payload.slug {
        validate_slug(&val)?;
        current.slug = val;
    }
    if let Some(val) = payload.description { current.description = Some(val); }
    if let Some(val) = payload.duration_minutes {
        if val < 1 {
            return Err(AppError::Validation("Duration must be at least 1 minute".into()));
        }
        current.duration_minutes = val;
    }
    if let Some(val) = payload.location_type { current.location_type = val; }
    if let Some(hosts) = &payload.host_ids {
        validate_hosts(&state, &org_id, hosts).await?;
    }

    let updated = state.event_type_repo.update(&current, payload.host_ids.as_deref()).await?;
    info!("Event type updated: {}", updated.event_type.id);
    Ok(Json(updated))
}

pub async fn delete_event_type(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
    Path((_, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    let current = find_in_org(&state, &org_id, &id).await?.event_type;
    if !auth.0.can_manage(&current.owner_id) {
        return Err(AppError::Forbidden("Only the owner or an organization admin can delete this event type".into()));
    }

    state.event_type_repo.delete(&current.id).await?;
    info!("Event type deleted: {}", current.id);
    Ok(Json(serde_json::json!({"status": "deleted"})))
}

/// Booking-page lookup by the owner's username and the event type slug.
pub async fn get_public_event_type(
    State(state): State<Arc<AppState>>,
    Path((username, slug)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let owner = state.user_repo.find_by_username(&username).await?
        .ok_or(AppError::NotFound("User not found".into()))?;
    let event_type = state.event_type_repo.find_by_owner_slug(&owner.id, &slug).await?
        .filter(|et| et.title != BLOCKED_TITLE)
        .ok_or_else(|| AppError::NotFound(format!("Event type '{}' not found", slug)))?;

    Ok(Json(PublicEventTypeResponse {
        event_type,
        host: PublicHost {
            name: owner.name,
            username: owner.username,
            timezone: owner.timezone,
        },
    }))
}
