mod common;

use axum::http::StatusCode;
use common::{TestApp};
use serde_json::json;

#[tokio::test]
async fn test_schedule_replace_and_validation() {
    let app = TestApp::new().await;
    let owner = app.register("Sched", "sched@example.com").await;
    let uri = format!("/api/v1/{}/schedule", owner.org_id);

    let (status, saved) = app.call("PUT", &uri, Some(&owner.auth), Some(json!({ "schedules": [
        { "day": 5, "start_time": "10:00", "end_time": "14:00" },
        { "day": 1, "start_time": "09:00", "end_time": "17:00" },
        { "day": 3, "start_time": "08:30", "end_time": "12:00" },
    ]}))).await;
    assert_eq!(status, StatusCode::OK, "{}", saved);

    let (status, listed) = app.call("GET", &uri, Some(&owner.auth), None).await;
    assert_eq!(status, StatusCode::OK);
    let days: Vec<i64> = listed.as_array().unwrap().iter().map(|w| w["day"].as_i64().unwrap()).collect();
    assert_eq!(days, vec![1, 3, 5]);

    // Replacing drops days that are no longer listed.
    app.set_schedule(&owner.org_id, &owner.auth, &owner.user_id, json!([
        { "day": 2, "start_time": "09:00", "end_time": "10:00" }
    ])).await;
    let (_, listed) = app.call("GET", &uri, Some(&owner.auth), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["day"], 2);

    for bad in [
        json!([{ "day": 7, "start_time": "09:00", "end_time": "10:00" }]),
        json!([{ "day": 1, "start_time": "9am", "end_time": "10:00" }]),
        json!([{ "day": 1, "start_time": "12:00", "end_time": "11:00" }]),
        json!([
            { "day": 1, "start_time": "09:00", "end_time": "10:00" },
            { "day": 1, "start_time": "11:00", "end_time": "12:00" }
        ]),
    ] {
        let (status, _) = app.call("PUT", &uri, Some(&owner.auth), Some(json!({ "schedules": bad }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", bad);
    }
}

#[tokio::test]
async fn test_members_cannot_edit_other_schedules() {
    let app = TestApp::new().await;
    let owner = app.register("Lead", "lead@example.com").await;
    app.set_plan(&owner.org_id, "team").await;
    let (member_id, member_auth) = app.add_member(&owner, "Crew", "crew@example.com").await;

    // Admins may edit a member's week.
    app.set_schedule(&owner.org_id, &owner.auth, &member_id, common::weekday_window(4)).await;

    let (status, _) = app.call(
        "PUT",
        &format!("/api/v1/{}/schedule", owner.org_id),
        Some(&member_auth),
        Some(json!({ "user_id": owner.user_id, "schedules": [] })),
    ).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, listed) = app.call("GET", &format!("/api/v1/{}/schedule", owner.org_id), Some(&member_auth), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed[0]["day"], 4);
}

#[tokio::test]
async fn test_member_management() {
    let app = TestApp::new().await;
    let owner = app.register("Org Owner", "orgowner@example.com").await;
    app.set_plan(&owner.org_id, "team").await;
    let members_uri = format!("/api/v1/{}/members", owner.org_id);

    let (status, admin) = app.call("POST", &members_uri, Some(&owner.auth), Some(json!({
        "name": "Ada Admin", "email": "ada@example.com", "role": "admin"
    }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(admin["role"], "admin");
    assert!(admin["temporary_password"].as_str().unwrap().len() >= 8);
    let admin_auth = app.login("ada@example.com", admin["temporary_password"].as_str().unwrap()).await;

    let (status, _) = app.call("POST", &members_uri, Some(&owner.auth), Some(json!({
        "name": "Dup", "email": "ada@example.com"
    }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.call("POST", &members_uri, Some(&owner.auth), Some(json!({
        "name": "Boss Two", "email": "boss2@example.com", "role": "owner"
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (member_id, member_auth) = app.add_member(&owner, "Mel", "mel@example.com").await;
    let (status, _) = app.call("POST", &members_uri, Some(&member_auth), Some(json!({
        "name": "Nope", "email": "nope@example.com"
    }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, list) = app.call("GET", &members_uri, Some(&member_auth), None).await;
    assert_eq!(list.as_array().unwrap().len(), 3);

    let (status, _) = app.call("DELETE", &format!("{}/{}", members_uri, owner.user_id), Some(&admin_auth), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.call("DELETE", &format!("{}/{}", members_uri, owner.user_id), Some(&owner.auth), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.call("DELETE", &format!("{}/{}", members_uri, member_id), Some(&admin_auth), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, list) = app.call("GET", &members_uri, Some(&owner.auth), None).await;
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_tag_crud_and_assignment() {
    let app = TestApp::new().await;
    let owner = app.register("Tagger", "tagger@example.com").await;
    let tags_uri = format!("/api/v1/{}/tags", owner.org_id);

    let (status, tag) = app.call("POST", &tags_uri, Some(&owner.auth), Some(json!({ "name": "Sales", "color": "#ff8800" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let tag_id = tag["id"].as_str().unwrap().to_string();

    let (status, _) = app.call("POST", &tags_uri, Some(&owner.auth), Some(json!({ "name": "Sales" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app.call("POST", &tags_uri, Some(&owner.auth), Some(json!({ "name": "Bad", "color": "orange" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, renamed) = app.call("PUT", &format!("{}/{}", tags_uri, tag_id), Some(&owner.auth), Some(json!({ "name": "Sales EMEA" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Sales EMEA");
    assert_eq!(renamed["color"], "#ff8800");

    let assign_uri = format!("/api/v1/{}/members/{}/tags/{}", owner.org_id, owner.user_id, tag_id);
    let (status, _) = app.call("PUT", &assign_uri, Some(&owner.auth), None).await;
    assert_eq!(status, StatusCode::OK);
    // Assigning twice is a no-op.
    let (status, _) = app.call("PUT", &assign_uri, Some(&owner.auth), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, member_tags) = app.call("GET", &format!("/api/v1/{}/members/{}/tags", owner.org_id, owner.user_id), Some(&owner.auth), None).await;
    assert_eq!(member_tags.as_array().unwrap().len(), 1);
    let (_, profile) = app.call("GET", &format!("/api/v1/{}/profile", owner.org_id), Some(&owner.auth), None).await;
    assert_eq!(profile["tags"][0]["name"], "Sales EMEA");

    let (status, _) = app.call("DELETE", &assign_uri, Some(&owner.auth), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, member_tags) = app.call("GET", &format!("/api/v1/{}/members/{}/tags", owner.org_id, owner.user_id), Some(&owner.auth), None).await;
    assert!(member_tags.as_array().unwrap().is_empty());

    let (status, _) = app.call("DELETE", &format!("{}/{}", tags_uri, tag_id), Some(&owner.auth), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.call("DELETE", &format!("{}/{}", tags_uri, tag_id), Some(&owner.auth), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, tags) = app.call("GET", &tags_uri, Some(&owner.auth), None).await;
    assert!(tags.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_plans_and_admin_subscription_changes() {
    let app = TestApp::new().await;
    let owner = app.register("Plan", "plan@example.com").await;

    let (status, plans) = app.call("GET", "/api/v1/plans", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = plans.as_array().unwrap().iter().map(|p| p["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["free", "pro", "team"]);

    let admin_uri = format!("/api/v1/admin/organizations/{}/subscription", owner.org_id);
    let (status, _) = app.call("PUT", &admin_uri, Some(&owner.auth), Some(json!({ "plan": "team" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.set_plan(&owner.org_id, "pro").await;
    let (_, sub) = app.call("GET", &format!("/api/v1/{}/subscription", owner.org_id), Some(&owner.auth), None).await;
    assert_eq!(sub["plan"]["id"], "pro");

    let root = app.login(common::SYSTEM_ADMIN_EMAIL, common::PASSWORD).await;
    let (status, _) = app.call("PUT", &admin_uri, Some(&root), Some(json!({ "plan": "platinum" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.call("PUT", "/api/v1/admin/organizations/missing/subscription", Some(&root), Some(json!({ "plan": "pro" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
