use crate::domain::ports::EmailService;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};
use base64::{Engine as _, engine::general_purpose};

/// Posts rendered mail to the relay service as JSON.
pub struct HttpEmailService {
    client: Client,
    api_url: String,
    api_key: String,
    from_alias: String,
}

impl HttpEmailService {
    pub fn new(api_url: String, api_key: String, from_alias: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_url, api_key, from_alias }
    }
}

#[derive(Serialize)]
struct AttachmentPayload {
    filename: String,
    content_base64: String,
}

#[derive(Serialize)]
struct EmailPayload {
    from_alias: String,
    to_addr: String,
    subject: String,
    html_body: String,
    attachments: Vec<AttachmentPayload>,
}

fn build_payload(
    from_alias: &str,
    recipient: &str,
    subject: &str,
    html_body: &str,
    attachment_name: Option<&str>,
    attachment_data: Option<&[u8]>,
) -> EmailPayload {
    let attachments = match (attachment_name, attachment_data) {
        (Some(name), Some(data)) => vec![AttachmentPayload {
            filename: name.to_string(),
            content_base64: general_purpose::STANDARD.encode(data),
        }],
        _ => Vec::new(),
    };

    EmailPayload {
        from_alias: from_alias.to_string(),
        to_addr: recipient.to_string(),
        subject: subject.to_string(),
        html_body: html_body.to_string(),
        attachments,
    }
}

#[async_trait]
impl EmailService for HttpEmailService {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
        attachment_name: Option<&str>,
        attachment_data: Option<&[u8]>
    ) -> Result<(), AppError> {
        let payload = build_payload(&self.from_alias, recipient, subject, html_body, attachment_name, attachment_data);

        let res = self.client.post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Email service connection error: {}", e);
                error!("{}", msg);
                AppError::InternalWithMsg(msg)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("Email service failed. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::InternalWithMsg(msg));
        }

        debug!(recipient = %recipient, "Email accepted by relay");
        Ok(())
    }
}
