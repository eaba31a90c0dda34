#![allow(dead_code)]

use scheduling_backend::{
    api::router::create_router,
    background::run_once,
    config::Config,
    domain::ports::{CalendarEventData, CalendarService, EmailService},
    domain::services::{auth_service::AuthService, notification_service::load_templates},
    error::AppError,
    infra::repositories::{
        sqlite_booking_repo::SqliteBookingRepo,
        sqlite_event_type_repo::SqliteEventTypeRepo,
        sqlite_job_repo::SqliteJobRepo,
        sqlite_organization_repo::SqliteOrganizationRepo,
        sqlite_schedule_repo::SqliteScheduleRepo,
        sqlite_tag_repo::SqliteTagRepo,
        sqlite_user_repo::SqliteUserRepo,
    },
    state::AppState,
};
use sqlx::{sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions}, Pool, Sqlite};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;
use uuid::Uuid;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    Router,
};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use tower::ServiceExt;
use serde_json::{json, Value};

pub const SYSTEM_ADMIN_EMAIL: &str = "root@example.com";
pub const PASSWORD: &str = "correct-horse-battery";

#[derive(Clone, Debug)]
pub struct SentEmail {
    pub recipient: String,
    pub subject: String,
    pub html: String,
    pub attachment_name: Option<String>,
}

#[derive(Default)]
pub struct MockEmailService {
    pub sent: Mutex<Vec<SentEmail>>,
}

impl MockEmailService {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailService for MockEmailService {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
        attachment_name: Option<&str>,
        _attachment_data: Option<&[u8]>
    ) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(SentEmail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            html: html_body.to_string(),
            attachment_name: attachment_name.map(str::to_string),
        });
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalendarMode {
    /// Answers truthfully from `busy_hosts`.
    Normal,
    Fails,
    Hangs,
}

pub struct MockCalendarService {
    pub mode: Mutex<CalendarMode>,
    pub busy_hosts: Mutex<HashSet<String>>,
    pub created: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
}

impl Default for MockCalendarService {
    fn default() -> Self {
        Self {
            mode: Mutex::new(CalendarMode::Normal),
            busy_hosts: Mutex::new(HashSet::new()),
            created: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }
}

impl MockCalendarService {
    pub fn set_mode(&self, mode: CalendarMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn mark_busy(&self, host_id: &str) {
        self.busy_hosts.lock().unwrap().insert(host_id.to_string());
    }
}

#[async_trait]
impl CalendarService for MockCalendarService {
    async fn is_busy(&self, host_id: &str, _start: DateTime<Utc>, _end: DateTime<Utc>) -> Result<bool, AppError> {
        let mode = *self.mode.lock().unwrap();
        match mode {
            CalendarMode::Normal => Ok(self.busy_hosts.lock().unwrap().contains(host_id)),
            CalendarMode::Fails => Err(AppError::InternalWithMsg("calendar unavailable".into())),
            CalendarMode::Hangs => {
                tokio::time::sleep(StdDuration::from_secs(30)).await;
                Ok(true)
            }
        }
    }

    async fn create_event(&self, _host_id: &str, _event: &CalendarEventData) -> Result<Option<String>, AppError> {
        let id = format!("cal_{}", Uuid::new_v4().simple());
        self.created.lock().unwrap().push(id.clone());
        Ok(Some(id))
    }

    async fn update_event(&self, _host_id: &str, _event_id: &str, _event: &CalendarEventData) -> Result<(), AppError> {
        Ok(())
    }

    async fn delete_event(&self, _host_id: &str, event_id: &str) -> Result<(), AppError> {
        self.deleted.lock().unwrap().push(event_id.to_string());
        Ok(())
    }
}

pub struct AuthHeaders {
    pub access_token: String,
    pub csrf_token: String,
}

/// A registered owner together with their organization.
pub struct Account {
    pub org_id: String,
    pub user_id: String,
    pub username: String,
    pub auth: AuthHeaders,
}

pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub email: Arc<MockEmailService>,
    pub calendar: Arc<MockCalendarService>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(false).await
    }

    /// Same database settings as production: WAL, busy timeout, five connections.
    pub async fn with_wal() -> Self {
        Self::build(true).await
    }

    async fn build(wal: bool) -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let mut connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .foreign_keys(true);
        let mut pool_options = SqlitePoolOptions::new();
        if wal {
            connection_options = connection_options
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(StdDuration::from_secs(5));
            pool_options = pool_options.max_connections(5);
        }

        let pool = pool_options
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let priv_key_pem = include_str!("../tests/keys/test_private.pem");
        let pub_key_pem = include_str!("../tests/keys/test_public.pem");

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            mail_service_url: "http://localhost".to_string(),
            mail_service_token: "token".to_string(),
            mail_from_alias: "test".to_string(),
            jwt_secret_key: priv_key_pem.to_string(),
            jwt_public_key: pub_key_pem.to_string(),
            auth_issuer: "test-issuer".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            mirotalk_url: "https://p2p.mirotalk.com".to_string(),
            google_calendar_api_url: "http://localhost/calendar".to_string(),
            calendar_check_timeout_ms: 200,
            system_admin_emails: vec![SYSTEM_ADMIN_EMAIL.to_string()],
        };

        let email = Arc::new(MockEmailService::default());
        let calendar = Arc::new(MockCalendarService::default());

        let state = Arc::new(AppState {
            config: config.clone(),
            organization_repo: Arc::new(SqliteOrganizationRepo::new(pool.clone())),
            user_repo: Arc::new(SqliteUserRepo::new(pool.clone())),
            schedule_repo: Arc::new(SqliteScheduleRepo::new(pool.clone())),
            event_type_repo: Arc::new(SqliteEventTypeRepo::new(pool.clone())),
            booking_repo: Arc::new(SqliteBookingRepo::new(pool.clone())),
            tag_repo: Arc::new(SqliteTagRepo::new(pool.clone())),
            job_repo: Arc::new(SqliteJobRepo::new(pool.clone())),
            auth_service: Arc::new(AuthService::new(config.clone()).unwrap()),
            email_service: email.clone(),
            calendar_service: calendar.clone(),
            templates: Arc::new(load_templates().unwrap()),
        });

        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            state,
            email,
            calendar,
        }
    }

    /// Sends a request and returns the status plus the JSON body (`Null` when empty).
    pub async fn call(&self, method: &str, uri: &str, auth: Option<&AuthHeaders>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder
                .header(header::COOKIE, format!("access_token={}", auth.access_token))
                .header("X-CSRF-Token", &auth.csrf_token);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn register(&self, name: &str, email: &str) -> Account {
        let response = self.router.clone().oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "name": name, "email": email, "password": PASSWORD }).to_string()))
                .unwrap()
        ).await.unwrap();

        if response.status() != StatusCode::CREATED {
            panic!("Register failed in test helper: status {}", response.status());
        }
        let (auth, body) = read_auth(response).await;

        Account {
            org_id: body["user"]["organization_id"].as_str().unwrap().to_string(),
            user_id: body["user"]["id"].as_str().unwrap().to_string(),
            username: body["user"]["username"].as_str().unwrap().to_string(),
            auth,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthHeaders {
        let response = self.router.clone().oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "email": email, "password": password }).to_string()))
                .unwrap()
        ).await.unwrap();

        if !response.status().is_success() {
            panic!("Login failed in test helper: status {}", response.status());
        }
        read_auth(response).await.0
    }

    /// Logs in the configured system admin, registering it on first use.
    pub async fn system_admin(&self) -> AuthHeaders {
        match self.state.user_repo.find_by_email(SYSTEM_ADMIN_EMAIL).await.unwrap() {
            Some(_) => self.login(SYSTEM_ADMIN_EMAIL, PASSWORD).await,
            None => self.register("Root", SYSTEM_ADMIN_EMAIL).await.auth,
        }
    }

    /// Moves an organization to another plan through the system admin endpoint.
    pub async fn set_plan(&self, org_id: &str, plan: &str) {
        let admin = self.system_admin().await;
        let (status, _) = self.call(
            "PUT",
            &format!("/api/v1/admin/organizations/{}/subscription", org_id),
            Some(&admin),
            Some(json!({ "plan": plan })),
        ).await;
        assert_eq!(status, StatusCode::OK);
    }

    /// Adds a member and logs them in with the returned temporary password.
    pub async fn add_member(&self, owner: &Account, name: &str, email: &str) -> (String, AuthHeaders) {
        let (status, body) = self.call(
            "POST",
            &format!("/api/v1/{}/members", owner.org_id),
            Some(&owner.auth),
            Some(json!({ "name": name, "email": email })),
        ).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        let id = body["id"].as_str().unwrap().to_string();
        let auth = self.login(email, body["temporary_password"].as_str().unwrap()).await;
        (id, auth)
    }

    pub async fn set_schedule(&self, account_org: &str, auth: &AuthHeaders, user_id: &str, windows: Value) {
        let (status, body) = self.call(
            "PUT",
            &format!("/api/v1/{}/schedule", account_org),
            Some(auth),
            Some(json!({ "user_id": user_id, "schedules": windows })),
        ).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }

    pub async fn create_event_type(&self, owner: &Account, title: &str, duration: i32, host_ids: &[&str]) -> String {
        let (status, body) = self.call(
            "POST",
            &format!("/api/v1/{}/event-types", owner.org_id),
            Some(&owner.auth),
            Some(json!({ "title": title, "duration_minutes": duration, "host_ids": host_ids })),
        ).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn book(&self, event_type_id: &str, start: DateTime<Utc>, email: &str) -> (StatusCode, Value) {
        self.call("POST", "/api/v1/bookings", None, Some(json!({
            "event_type_id": event_type_id,
            "start_time": start.to_rfc3339(),
            "attendee_name": "Guest",
            "attendee_email": email,
        }))).await
    }

    /// Runs the notification worker until the due queue is empty.
    pub async fn drain_jobs(&self) {
        while run_once(&self.state).await > 0 {}
    }

    pub async fn job_types_for(&self, booking_id: &str) -> Vec<(String, String)> {
        sqlx::query_as::<_, (String, String)>(
            "SELECT job_type, status FROM jobs WHERE json_extract(payload, '$.booking_id') = ? ORDER BY execute_at, created_at"
        )
            .bind(booking_id)
            .fetch_all(&self.pool)
            .await
            .unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}

async fn read_auth(response: axum::response::Response) -> (AuthHeaders, Value) {
    let cookies: Vec<String> = response.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|h| h.to_str().unwrap().to_string())
        .collect();

    let access_token_cookie = cookies.iter()
        .find(|c| c.contains("access_token="))
        .expect("No access_token cookie returned");

    let start = access_token_cookie.find("access_token=").unwrap() + 13;
    let end = access_token_cookie[start..].find(';').unwrap_or(access_token_cookie.len() - start);
    let access_token = access_token_cookie[start..start + end].to_string();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap();
    let csrf_token = body["csrf_token"].as_str().expect("No csrf_token in body").to_string();

    (AuthHeaders { access_token, csrf_token }, body)
}

/// A date of the given weekday at least two days ahead, so every slot is in the future.
pub fn upcoming(weekday: Weekday) -> NaiveDate {
    let mut date = Utc::now().date_naive() + Duration::days(2);
    while date.weekday() != weekday {
        date += Duration::days(1);
    }
    date
}

pub fn at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    date.and_hms_opt(hour, minute, 0).unwrap().and_utc()
}

pub fn weekday_window(day: i32) -> Value {
    json!([{ "day": day, "start_time": "09:00", "end_time": "17:00" }])
}
