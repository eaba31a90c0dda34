use axum::{extract::{Query, State}, response::IntoResponse, Json};
use crate::api::dtos::{requests::WidgetQuery, responses::{WidgetEventTypeResponse, WidgetHost}};
use crate::domain::models::{booking::BLOCKED_TITLE, event_type::EventType, user::User};
use crate::domain::services::host_selection::candidate_hosts;
use crate::error::AppError;
use crate::state::AppState;
use std::sync::Arc;
use tracing::debug;

/// A username wins over an organization slug; a slug stands for the
/// organization's first owner or admin.
async fn resolve_identifier(state: &AppState, identifier: &str) -> Result<Option<User>, AppError> {
    if let Some(user) = state.user_repo.find_by_username(identifier).await? {
        return Ok(Some(user));
    }
    let Some(organization) = state.organization_repo.find_by_slug(identifier).await? else {
        return Ok(None);
    };
    debug!(organization_id = %organization.id, "Widget identifier is an organization slug");
    state.user_repo.find_first_admin(&organization.id).await
}

/// The user's own event type, else the first colleague's with that slug.
async fn find_event_type_in_org(state: &AppState, user: &User, slug: &str) -> Result<Option<EventType>, AppError> {
    if let Some(own) = state.event_type_repo.find_by_owner_slug(&user.id, slug).await? {
        return Ok(Some(own));
    }
    for member in state.user_repo.list_by_organization(&user.organization_id).await? {
        if member.id == user.id {
            continue;
        }
        if let Some(found) = state.event_type_repo.find_by_owner_slug(&member.id, slug).await? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

pub async fn get_widget_event_type(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WidgetQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(identifier), Some(slug)) = (
        query.identifier.filter(|s| !s.trim().is_empty()),
        query.slug.filter(|s| !s.trim().is_empty()),
    ) else {
        return Err(AppError::Validation("Missing identifier or slug".into()));
    };

    let user = resolve_identifier(&state, identifier.trim()).await?
        .ok_or(AppError::NotFound("User or organization not found".into()))?;

    let event_type = find_event_type_in_org(&state, &user, slug.trim()).await?
        .filter(|et| et.title != BLOCKED_TITLE)
        .ok_or(AppError::NotFound("Event type not found".into()))?;

    let with_hosts = state.event_type_repo.find_by_id(&event_type.id).await?
        .ok_or(AppError::NotFound("Event type not found".into()))?;

    let mut hosts = Vec::new();
    for id in candidate_hosts(&with_hosts) {
        if let Some(host) = state.user_repo.find_by_id(&id).await? {
            hosts.push(WidgetHost {
                id: host.id,
                name: host.name,
                username: host.username,
                timezone: host.timezone,
            });
        }
    }

    Ok(Json(WidgetEventTypeResponse { event_type: with_hosts.event_type, hosts }))
}
