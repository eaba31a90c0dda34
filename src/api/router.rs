use axum::{
    body::Body,
    extract::Request,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{
    admin, auth, availability, booking, calendar, event_type, health, member, profile, schedule, subscription, tag,
    widget,
};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tower_cookies::CookieManagerLayer;
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Auth
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/logout", post(auth::logout))

        // Public booking flow
        .route("/api/v1/public/{username}/{slug}", get(event_type::get_public_event_type))
        .route("/api/v1/availability", get(availability::get_day_slots))
        .route("/api/v1/availability/month", get(availability::get_month_days))
        .route("/api/v1/bookings", post(booking::create_booking))
        .route("/api/v1/bookings/{booking_id}/ical", get(booking::get_booking_ical))
        .route("/api/v1/widget/event-type", get(widget::get_widget_event_type))

        // Plans
        .route("/api/v1/plans", get(subscription::list_plans))
        .route("/api/v1/admin/organizations/{org_id}/subscription", put(subscription::admin_update_subscription))

        // System admin
        .route("/api/v1/admin/users", get(admin::list_users).post(admin::create_user))
        .route("/api/v1/admin/users/{user_id}", patch(admin::update_user).delete(admin::delete_user))
        .route("/api/v1/admin/organizations", get(admin::list_organizations).post(admin::create_organization))
        .route("/api/v1/admin/organizations/{org_id}", patch(admin::update_organization).delete(admin::delete_organization))

        // Organization
        .route("/api/v1/{org_id}/profile", get(profile::get_profile).put(profile::update_profile))
        .route("/api/v1/{org_id}/members", post(member::create_member).get(member::list_members))
        .route("/api/v1/{org_id}/members/{user_id}", delete(member::delete_member))
        .route("/api/v1/{org_id}/members/{user_id}/tags", get(tag::list_member_tags))
        .route("/api/v1/{org_id}/members/{user_id}/tags/{tag_id}", put(tag::assign_tag).delete(tag::unassign_tag))
        .route("/api/v1/{org_id}/tags", get(tag::list_tags).post(tag::create_tag))
        .route("/api/v1/{org_id}/tags/{tag_id}", put(tag::update_tag).delete(tag::delete_tag))
        .route("/api/v1/{org_id}/subscription", get(subscription::get_subscription))
        .route("/api/v1/{org_id}/calendar/google", get(calendar::get_google_status).put(calendar::put_google_token))

        // Schedules & event types
        .route("/api/v1/{org_id}/schedule", get(schedule::get_schedule).put(schedule::replace_schedule))
        .route("/api/v1/{org_id}/event-types", post(event_type::create_event_type).get(event_type::list_event_types))
        .route("/api/v1/{org_id}/event-types/{event_type_id}", get(event_type::get_event_type).put(event_type::update_event_type).delete(event_type::delete_event_type))

        // Booking management
        .route("/api/v1/{org_id}/bookings", post(booking::create_manual_booking).get(booking::list_bookings))
        .route("/api/v1/{org_id}/bookings/{booking_id}", get(booking::get_booking).patch(booking::update_booking).delete(booking::delete_booking))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        org_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .layer(CookieManagerLayer::new())
        .with_state(state)
}
