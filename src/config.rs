use std::env;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub mail_service_url: String,
    pub mail_service_token: String,
    pub mail_from_alias: String,
    pub jwt_secret_key: String, // Private key (PEM)
    pub jwt_public_key: String, // Public key (PEM)
    pub auth_issuer: String,
    pub public_base_url: String,
    pub mirotalk_url: String,
    pub google_calendar_api_url: String,
    pub calendar_check_timeout_ms: u64,
    pub system_admin_emails: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().expect("PORT must be a number"),
            mail_service_url: env::var("MAIL_SERVICE_URL").unwrap_or_else(|_| "http://localhost:8000/api/v1/send".to_string()),
            mail_service_token: env::var("MAIL_SERVICE_TOKEN").unwrap_or_else(|_| "test-token-1".to_string()),
            mail_from_alias: env::var("MAIL_FROM_ALIAS").unwrap_or_else(|_| "scheduling".to_string()),
            jwt_secret_key: env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set (Ed25519 Private Key)"),
            jwt_public_key: env::var("JWT_PUBLIC_KEY").expect("JWT_PUBLIC_KEY must be set (Ed25519 Public Key)"),
            auth_issuer: env::var("AUTH_ISSUER").unwrap_or_else(|_| "https://api.scheduling.local".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            mirotalk_url: env::var("MIROTALK_URL").unwrap_or_else(|_| "https://p2p.mirotalk.com".to_string()),
            google_calendar_api_url: env::var("GOOGLE_CALENDAR_API_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/calendar/v3".to_string()),
            calendar_check_timeout_ms: env::var("CALENDAR_CHECK_TIMEOUT_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .expect("CALENDAR_CHECK_TIMEOUT_MS must be a number"),
            system_admin_emails: parse_email_list(&env::var("SYSTEM_ADMIN_EMAILS").unwrap_or_default()),
        }
    }

    pub fn calendar_check_timeout(&self) -> Duration {
        Duration::from_millis(self.calendar_check_timeout_ms)
    }

    pub fn is_system_admin(&self, email: &str) -> bool {
        self.system_admin_emails.iter().any(|e| e.eq_ignore_ascii_case(email))
    }
}

fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
