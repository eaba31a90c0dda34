use crate::domain::ports::{CalendarEventData, CalendarService, UserRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

const MAX_RETRIES: u32 = 2;
const INITIAL_BACKOFF_MS: u64 = 250;
const PRIMARY_CALENDAR: &str = "primary";

/// Google Calendar adapter. Each host authorizes with their own access
/// token; hosts without one are treated as having no external calendar.
pub struct GoogleCalendarService {
    client: Client,
    api_url: String,
    user_repo: Arc<dyn UserRepository>,
}

impl GoogleCalendarService {
    pub fn new(api_url: String, user_repo: Arc<dyn UserRepository>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_url: api_url.trim_end_matches('/').to_string(),
            user_repo,
        }
    }

    async fn token_for(&self, host_id: &str) -> Result<Option<String>, AppError> {
        Ok(self
            .user_repo
            .find_by_id(host_id)
            .await?
            .and_then(|u| u.calendar_access_token)
            .filter(|t| !t.is_empty()))
    }

    async fn send_with_retry(&self, method: Method, url: &str, token: &str, body: Option<&Value>) -> Result<Option<Value>, AppError> {
        let mut retries = 0;
        let mut backoff = INITIAL_BACKOFF_MS;

        loop {
            let mut req = self.client.request(method.clone(), url).bearer_auth(token);
            if let Some(body) = body {
                req = req.json(body);
            }

            match req.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::NO_CONTENT {
                        return Ok(None);
                    }
                    if status.is_success() {
                        let body: Value = response.json().await.map_err(|e| {
                            error!("Failed to parse calendar response JSON: {:?}", e);
                            AppError::Internal
                        })?;
                        return Ok(Some(body));
                    }
                    if !(status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS) || retries >= MAX_RETRIES {
                        let text = response.text().await.unwrap_or_default();
                        return Err(AppError::InternalWithMsg(format!("Calendar API error {}: {}", status, text)));
                    }
                    warn!("Calendar API transient error {}. Retrying in {}ms...", status, backoff);
                }
                Err(e) => {
                    if retries >= MAX_RETRIES {
                        return Err(AppError::InternalWithMsg(format!("Calendar network error: {}", e)));
                    }
                    warn!("Calendar network error. Retrying in {}ms... {:?}", backoff, e);
                }
            }

            sleep(Duration::from_millis(backoff)).await;
            retries += 1;
            backoff *= 2;
        }
    }
}

fn event_body(event: &CalendarEventData) -> Value {
    let mut body = json!({
        "summary": event.title,
        "description": event.description.clone().unwrap_or_default(),
        "start": { "dateTime": event.start_time.to_rfc3339() },
        "end": { "dateTime": event.end_time.to_rfc3339() },
    });
    if let Some(location) = &event.location {
        body["location"] = json!(location);
    }
    if let Some(email) = &event.attendee_email {
        body["attendees"] = json!([{ "email": email, "displayName": event.attendee_name }]);
    }
    body
}

/// True when the freeBusy answer lists any busy period for the primary calendar.
fn has_busy_periods(response: &Value) -> bool {
    response["calendars"][PRIMARY_CALENDAR]["busy"]
        .as_array()
        .map(|periods| !periods.is_empty())
        .unwrap_or(false)
}

#[async_trait]
impl CalendarService for GoogleCalendarService {
    async fn is_busy(&self, host_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<bool, AppError> {
        let Some(token) = self.token_for(host_id).await? else {
            return Ok(false);
        };

        let body = json!({
            "timeMin": start.to_rfc3339(),
            "timeMax": end.to_rfc3339(),
            "items": [{ "id": PRIMARY_CALENDAR }],
        });
        let url = format!("{}/freeBusy", self.api_url);
        let response = self.send_with_retry(Method::POST, &url, &token, Some(&body)).await?;

        Ok(response.as_ref().map(has_busy_periods).unwrap_or(false))
    }

    async fn create_event(&self, host_id: &str, event: &CalendarEventData) -> Result<Option<String>, AppError> {
        let Some(token) = self.token_for(host_id).await? else {
            return Ok(None);
        };

        let url = format!("{}/calendars/{}/events", self.api_url, PRIMARY_CALENDAR);
        let response = self.send_with_retry(Method::POST, &url, &token, Some(&event_body(event))).await?;
        let id = response.and_then(|v| v["id"].as_str().map(str::to_string));

        if let Some(id) = &id {
            info!(host_id = %host_id, event_id = %id, "Created external calendar event");
        }
        Ok(id)
    }

    async fn update_event(&self, host_id: &str, event_id: &str, event: &CalendarEventData) -> Result<(), AppError> {
        let Some(token) = self.token_for(host_id).await? else {
            return Ok(());
        };

        let url = format!("{}/calendars/{}/events/{}", self.api_url, PRIMARY_CALENDAR, event_id);
        self.send_with_retry(Method::PATCH, &url, &token, Some(&event_body(event))).await?;
        Ok(())
    }

    async fn delete_event(&self, host_id: &str, event_id: &str) -> Result<(), AppError> {
        let Some(token) = self.token_for(host_id).await? else {
            return Ok(());
        };

        let url = format!("{}/calendars/{}/events/{}", self.api_url, PRIMARY_CALENDAR, event_id);
        self.send_with_retry(Method::DELETE, &url, &token, None).await?;
        Ok(())
    }
}
