mod common;

use axum::{body::Body, http::{header, Request, StatusCode}};
use chrono::{Duration, Utc, Weekday};
use common::{at, upcoming, weekday_window, TestApp};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_public_booking_lifecycle() {
    let app = TestApp::new().await;
    let owner = app.register("Bea Booker", "bea@example.com").await;
    app.set_schedule(&owner.org_id, &owner.auth, &owner.user_id, weekday_window(1)).await;
    let event_type_id = app.create_event_type(&owner, "Intro Call", 60, &[]).await;
    let monday = upcoming(Weekday::Mon);

    let (status, booking) = app.book(&event_type_id, at(monday, 10, 0), "guest@example.com").await;
    assert_eq!(status, StatusCode::CREATED, "{}", booking);
    assert_eq!(booking["host_id"], owner.user_id.as_str());
    assert_eq!(booking["status"], "confirmed");
    assert_eq!(booking["end_time"], json!(at(monday, 11, 0)));
    assert!(booking["meeting_url"].as_str().unwrap().starts_with("https://p2p.mirotalk.com/join/"));
    // Free plan has no calendar integration.
    assert!(booking["calendar_event_id"].is_null());

    let booking_id = booking["id"].as_str().unwrap();
    let jobs = app.job_types_for(booking_id).await;
    assert_eq!(jobs, vec![
        ("CONFIRMATION".to_string(), "PENDING".to_string()),
        ("REMINDER".to_string(), "PENDING".to_string()),
    ]);

    app.drain_jobs().await;
    let sent = app.email.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "guest@example.com");
    assert_eq!(sent[0].subject, "Booking Confirmed: Intro Call");
    assert_eq!(sent[0].attachment_name.as_deref(), Some("invite.ics"));

    let jobs = app.job_types_for(booking_id).await;
    assert_eq!(jobs[0], ("CONFIRMATION".to_string(), "COMPLETED".to_string()));
    assert_eq!(jobs[1], ("REMINDER".to_string(), "PENDING".to_string()));
}

#[tokio::test]
async fn test_double_booking_and_unoffered_times_conflict() {
    let app = TestApp::new().await;
    let owner = app.register("Solo", "solo@example.com").await;
    app.set_schedule(&owner.org_id, &owner.auth, &owner.user_id, weekday_window(1)).await;
    let event_type_id = app.create_event_type(&owner, "Solo", 60, &[]).await;
    let monday = upcoming(Weekday::Mon);

    let (status, _) = app.book(&event_type_id, at(monday, 10, 0), "first@example.com").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.book(&event_type_id, at(monday, 10, 0), "second@example.com").await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Partial overlap with the existing hour.
    let (status, _) = app.book(&event_type_id, at(monday, 10, 30), "third@example.com").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.book(&event_type_id, at(monday, 8, 0), "early@example.com").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Selected time slot is not available");
    assert_eq!(body["code"], "conflict");

    // Off-grid start inside the window.
    let (status, _) = app.book(&event_type_id, at(monday, 13, 15), "odd@example.com").await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Back-to-back is fine.
    let (status, _) = app.book(&event_type_id, at(monday, 11, 0), "next@example.com").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_booking_input_validation() {
    let app = TestApp::new().await;
    let owner = app.register("Val", "val@example.com").await;
    let event_type_id = app.create_event_type(&owner, "Val", 30, &[]).await;

    let past = (Utc::now() - Duration::days(1)).date_naive();
    let (status, _) = app.book(&event_type_id, at(past, 10, 0), "guest@example.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let monday = upcoming(Weekday::Mon);
    let (status, body) = app.book(&event_type_id, at(monday, 10, 0), "not-an-email").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");

    let (status, _) = app.book("unknown-event", at(monday, 10, 0), "guest@example.com").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ical_download() {
    let app = TestApp::new().await;
    let owner = app.register("Ical", "ical@example.com").await;
    let event_type_id = app.create_event_type(&owner, "Calendar Sync", 30, &[]).await;
    let monday = upcoming(Weekday::Mon);
    let (_, booking) = app.book(&event_type_id, at(monday, 9, 0), "guest@example.com").await;
    let booking_id = booking["id"].as_str().unwrap();

    let response = app.router.clone().oneshot(
        Request::builder()
            .uri(format!("/api/v1/bookings/{}/ical", booking_id))
            .body(Body::empty())
            .unwrap()
    ).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/calendar"));
    assert!(response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().contains(".ics"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let ics = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(ics.contains("BEGIN:VCALENDAR"));
    assert!(ics.contains("Calendar Sync"));

    let (status, _) = app.call("GET", "/api/v1/bookings/missing/ical", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_for_one_slot() {
    let app = TestApp::with_wal().await;
    let owner = app.register("Rush Hour", "rush@example.com").await;
    app.set_schedule(&owner.org_id, &owner.auth, &owner.user_id, weekday_window(1)).await;
    let event_type_id = app.create_event_type(&owner, "Popular", 30, &[]).await;
    let start = at(upcoming(Weekday::Mon), 10, 0);

    let mut handles = Vec::new();
    for i in 0..20 {
        let router = app.router.clone();
        let body = json!({
            "event_type_id": event_type_id,
            "start_time": start.to_rfc3339(),
            "attendee_name": "Guest",
            "attendee_email": format!("guest{}@example.com", i),
        });
        handles.push(tokio::spawn(async move {
            let request = Request::builder()
                .method("POST")
                .uri("/api/v1/bookings")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            router.oneshot(request).await.unwrap().status()
        }));
    }

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }

    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CREATED).count(), 1, "{:?}", statuses);
    assert!(
        statuses.iter().all(|s| *s == StatusCode::CREATED || *s == StatusCode::CONFLICT),
        "{:?}",
        statuses
    );

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE status != 'cancelled'")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}
