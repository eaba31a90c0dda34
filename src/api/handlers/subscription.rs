use axum::{extract::{Path, State}, response::IntoResponse, Json};
use crate::api::dtos::{
    requests::UpdateSubscriptionRequest,
    responses::{SubscriptionResponse, UsageResponse},
};
use crate::api::extractors::{auth::AuthUser, org::OrgId};
use crate::domain::services::booking_service::{current_month_range, organization_plan};
use crate::domain::services::subscription::{all_plans, get_plan_by_id, PlanId};
use crate::error::AppError;
use crate::state::AppState;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

pub async fn list_plans() -> impl IntoResponse {
    Json(all_plans())
}

pub async fn get_subscription(
    State(state): State<Arc<AppState>>,
    OrgId(org_id): OrgId,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    auth.require_org(&org_id)?;
    let plan = organization_plan(&state, &org_id).await?;
    let (month_start, month_end) = current_month_range(Utc::now());

    let usage = UsageResponse {
        event_types: state.event_type_repo.list_by_organization(&org_id).await?.len() as i64,
        bookings_this_month: state.booking_repo.count_for_organization_between(&org_id, month_start, month_end).await?,
        team_members: state.user_repo.count_by_organization(&org_id).await?,
    };

    Ok(Json(SubscriptionResponse { plan, usage }))
}

pub async fn admin_update_subscription(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(org_id): Path<String>,
    Json(payload): Json<UpdateSubscriptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_system_admin(&state.config)?;
    let plan_id = PlanId::parse(&payload.plan)
        .ok_or(AppError::Validation("Plan must be free, pro or team".into()))?;

    let mut organization = state.organization_repo.find_by_id(&org_id).await?
        .ok_or(AppError::NotFound("Organization not found".into()))?;
    organization.subscription_plan = plan_id.as_str().to_string();
    let updated = state.organization_repo.update(&organization).await?;

    info!(organization_id = %org_id, plan = plan_id.as_str(), "Subscription plan changed");
    Ok(Json(serde_json::json!({
        "organization": updated,
        "plan": get_plan_by_id(Some(plan_id.as_str())),
    })))
}
