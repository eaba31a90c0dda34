mod common;

use axum::http::StatusCode;
use chrono::Weekday;
use common::{at, upcoming, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_event_type_crud() {
    let app = TestApp::new().await;
    let owner = app.register("Evan", "evan@example.com").await;
    app.set_plan(&owner.org_id, "team").await;
    let base = format!("/api/v1/{}/event-types", owner.org_id);

    let (status, created) = app.call("POST", &base, Some(&owner.auth), Some(json!({
        "title": "Deep Dive Session",
        "description": "Ninety minutes of focus",
        "duration_minutes": 90,
    }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["slug"], "deep-dive-session");
    assert_eq!(created["location_type"], "mirotalk");
    assert_eq!(created["host_ids"], json!([]));
    let id = created["id"].as_str().unwrap();

    let (status, _) = app.call("POST", &base, Some(&owner.auth), Some(json!({
        "title": "Deep Dive Session", "duration_minutes": 30,
    }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.call("POST", &base, Some(&owner.auth), Some(json!({
        "title": "Zero", "duration_minutes": 0,
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (member_id, _) = app.add_member(&owner, "Helper", "helper@example.com").await;
    let (status, updated) = app.call("PUT", &format!("{}/{}", base, id), Some(&owner.auth), Some(json!({
        "duration_minutes": 45,
        "host_ids": [owner.user_id, member_id],
    }))).await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["duration_minutes"], 45);
    assert_eq!(updated["host_ids"].as_array().unwrap().len(), 2);
    assert_eq!(updated["title"], "Deep Dive Session");

    let (_, fetched) = app.call("GET", &format!("{}/{}", base, id), Some(&owner.auth), None).await;
    assert_eq!(fetched["host_ids"].as_array().unwrap().len(), 2);

    let (_, list) = app.call("GET", &base, Some(&owner.auth), None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = app.call("GET", &format!("{}/missing", base), Some(&owner.auth), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_event_type_removes_bookings() {
    let app = TestApp::new().await;
    let owner = app.register("Remy", "remy@example.com").await;
    let event_type_id = app.create_event_type(&owner, "Temporary", 30, &[]).await;
    let (_, booking) = app.book(&event_type_id, at(upcoming(Weekday::Mon), 9, 0), "g@example.com").await;
    let booking_uri = format!("/api/v1/{}/bookings/{}", owner.org_id, booking["id"].as_str().unwrap());

    let (status, _) = app.call("DELETE", &format!("/api/v1/{}/event-types/{}", owner.org_id, event_type_id), Some(&owner.auth), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call("GET", &booking_uri, Some(&owner.auth), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.call("DELETE", &format!("/api/v1/{}/event-types/{}", owner.org_id, event_type_id), Some(&owner.auth), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The free plan slot is available again.
    app.create_event_type(&owner, "Replacement", 30, &[]).await;
}

#[tokio::test]
async fn test_public_event_type_lookup() {
    let app = TestApp::new().await;
    let owner = app.register("Pia Public", "pia@example.com").await;
    app.create_event_type(&owner, "Office Hours", 20, &[]).await;

    let (status, body) = app.call("GET", &format!("/api/v1/public/{}/office-hours", owner.username), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event_type"]["title"], "Office Hours");
    assert_eq!(body["event_type"]["duration_minutes"], 20);
    assert_eq!(body["host"]["name"], "Pia Public");
    assert_eq!(body["host"]["timezone"], "UTC");
    assert!(body["host"].get("email").is_none());

    let (status, _) = app.call("GET", &format!("/api/v1/public/{}/nope", owner.username), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.call("GET", "/api/v1/public/nobody/office-hours", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_member_cannot_edit_owner_event_type() {
    let app = TestApp::new().await;
    let owner = app.register("Ola", "ola@example.com").await;
    app.set_plan(&owner.org_id, "team").await;
    let (_, member_auth) = app.add_member(&owner, "Pat", "pat@example.com").await;
    let event_type_id = app.create_event_type(&owner, "Owned", 30, &[]).await;
    let uri = format!("/api/v1/{}/event-types/{}", owner.org_id, event_type_id);

    let (status, _) = app.call("PUT", &uri, Some(&member_auth), Some(json!({ "title": "Hijacked" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.call("DELETE", &uri, Some(&member_auth), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.call("GET", &uri, Some(&member_auth), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_widget_lookup_by_username_or_org_slug() {
    let app = TestApp::new().await;
    let owner = app.register("Wanda Widget", "wanda@example.com").await;
    app.set_plan(&owner.org_id, "team").await;
    let (member_id, member_auth) = app.add_member(&owner, "Mo Member", "mo@example.com").await;
    app.create_event_type(&owner, "Consult", 30, &[]).await;

    let (status, _) = app.call(
        "POST",
        &format!("/api/v1/{}/event-types", owner.org_id),
        Some(&member_auth),
        Some(json!({ "title": "Deep Dive", "duration_minutes": 90 })),
    ).await;
    assert_eq!(status, StatusCode::CREATED);

    let (org_slug,): (String,) = sqlx::query_as("SELECT slug FROM organizations WHERE id = ?")
        .bind(&owner.org_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();

    let (status, body) = app.call("GET", &format!("/api/v1/widget/event-type?identifier={}&slug=consult", owner.username), None, None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["title"], "Consult");
    assert_eq!(body["hosts"][0]["id"], owner.user_id.as_str());
    assert!(body["hosts"][0].get("email").is_none());

    // Organization slug resolves to the owner.
    let (status, body) = app.call("GET", &format!("/api/v1/widget/event-type?identifier={}&slug=consult", org_slug), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner_id"], owner.user_id.as_str());

    // A colleague's event type is found through the organization.
    let (status, body) = app.call("GET", &format!("/api/v1/widget/event-type?identifier={}&slug=deep-dive", org_slug), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner_id"], member_id.as_str());
    assert_eq!(body["duration_minutes"], 90);

    let (status, _) = app.call("GET", "/api/v1/widget/event-type?identifier=nobody-here&slug=consult", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.call("GET", &format!("/api/v1/widget/event-type?identifier={}&slug=missing", owner.username), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = app.call("GET", &format!("/api/v1/widget/event-type?identifier={}", owner.username), None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");
}

#[tokio::test]
async fn test_blocked_time_is_not_bookable_publicly() {
    let app = TestApp::new().await;
    let owner = app.register("Hidden Hours", "hidden@example.com").await;
    let monday = upcoming(Weekday::Mon);

    let (status, blocked) = app.call("POST", &format!("/api/v1/{}/bookings", owner.org_id), Some(&owner.auth), Some(json!({
        "status": "blocked",
        "start_time": at(monday, 12, 0),
        "end_time": at(monday, 13, 0),
    }))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", blocked);

    let (status, _) = app.call("GET", &format!("/api/v1/widget/event-type?identifier={}&slug=blocked-time", owner.username), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.call("GET", &format!("/api/v1/public/{}/blocked-time", owner.username), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
