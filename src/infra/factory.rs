use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::state::AppState;
use crate::domain::ports::UserRepository;
use crate::domain::services::{auth_service::AuthService, notification_service::load_templates};
use crate::infra::calendar::google_calendar_service::GoogleCalendarService;
use crate::infra::email::http_email_service::HttpEmailService;
use crate::infra::repositories::{
    postgres_booking_repo::PostgresBookingRepo, postgres_event_type_repo::PostgresEventTypeRepo,
    postgres_job_repo::PostgresJobRepo, postgres_organization_repo::PostgresOrganizationRepo,
    postgres_schedule_repo::PostgresScheduleRepo, postgres_tag_repo::PostgresTagRepo,
    postgres_user_repo::PostgresUserRepo,
    sqlite_booking_repo::SqliteBookingRepo, sqlite_event_type_repo::SqliteEventTypeRepo,
    sqlite_job_repo::SqliteJobRepo, sqlite_organization_repo::SqliteOrganizationRepo,
    sqlite_schedule_repo::SqliteScheduleRepo, sqlite_tag_repo::SqliteTagRepo,
    sqlite_user_repo::SqliteUserRepo,
};

pub async fn bootstrap_state(config: &Config) -> AppState {
    let database_url = &config.database_url;
    let email_service = Arc::new(HttpEmailService::new(
        config.mail_service_url.clone(),
        config.mail_service_token.clone(),
        config.mail_from_alias.clone(),
    ));

    let templates = Arc::new(load_templates().expect("Failed to load email templates"));
    let auth_service = Arc::new(AuthService::new(config.clone()).expect("Failed to initialize auth service"));

    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let mut opts: PgConnectOptions = database_url.parse().expect("Invalid Postgres URL");
        opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .expect("Failed to connect to Postgres");

        run_postgres_migrations(&pool).await;

        let user_repo: Arc<dyn UserRepository> = Arc::new(PostgresUserRepo::new(pool.clone()));
        let calendar_service = Arc::new(GoogleCalendarService::new(config.google_calendar_api_url.clone(), user_repo.clone()));

        AppState {
            config: config.clone(),
            organization_repo: Arc::new(PostgresOrganizationRepo::new(pool.clone())),
            user_repo,
            schedule_repo: Arc::new(PostgresScheduleRepo::new(pool.clone())),
            event_type_repo: Arc::new(PostgresEventTypeRepo::new(pool.clone())),
            booking_repo: Arc::new(PostgresBookingRepo::new(pool.clone())),
            tag_repo: Arc::new(PostgresTagRepo::new(pool.clone())),
            job_repo: Arc::new(PostgresJobRepo::new(pool.clone())),
            auth_service,
            email_service,
            calendar_service,
            templates,
        }
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)
            .expect("Invalid SQLite connection string")
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .expect("Failed to connect to SQLite");

        run_sqlite_migrations(&pool).await;

        let user_repo: Arc<dyn UserRepository> = Arc::new(SqliteUserRepo::new(pool.clone()));
        let calendar_service = Arc::new(GoogleCalendarService::new(config.google_calendar_api_url.clone(), user_repo.clone()));

        AppState {
            config: config.clone(),
            organization_repo: Arc::new(SqliteOrganizationRepo::new(pool.clone())),
            user_repo,
            schedule_repo: Arc::new(SqliteScheduleRepo::new(pool.clone())),
            event_type_repo: Arc::new(SqliteEventTypeRepo::new(pool.clone())),
            booking_repo: Arc::new(SqliteBookingRepo::new(pool.clone())),
            tag_repo: Arc::new(SqliteTagRepo::new(pool.clone())),
            job_repo: Arc::new(SqliteJobRepo::new(pool.clone())),
            auth_service,
            email_service,
            calendar_service,
            templates,
        }
    }
}

pub async fn run_postgres_migrations(pool: &PgPool) {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .expect("Failed to run Postgres migrations");
}

pub async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}
