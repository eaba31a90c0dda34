use std::env;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "scheduling-backend.log";
/// sqlx logs every statement at debug, keep it out of the file.
const FILE_DIRECTIVES: &str = "info,scheduling_backend=debug,sqlx=warn,tower_http=debug";
const CONSOLE_DIRECTIVES: &str = "info,sqlx=warn";

pub struct LogSettings {
    pub dir: String,
    pub file_filter: String,
    /// One JSON object per line on stdout, for container log collectors.
    pub console_json: bool,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self {
            dir: env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string()),
            file_filter: env::var("LOG_FILE_FILTER").unwrap_or_else(|_| FILE_DIRECTIVES.to_string()),
            console_json: env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")),
        }
    }
}

fn filter_or(directives: &str, fallback: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid log filter {:?}: {}", directives, e);
        EnvFilter::new(fallback)
    })
}

pub fn init(settings: &LogSettings) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(&settings.dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Close events carry busy/idle timings for request and background_job spans.
    let file_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(non_blocking)
        .with_filter(filter_or(&settings.file_filter, FILE_DIRECTIVES));

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(CONSOLE_DIRECTIVES));
    let console_layer = if settings.console_json {
        fmt::layer().json().with_filter(console_filter).boxed()
    } else {
        fmt::layer().compact().with_target(false).with_filter(console_filter).boxed()
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    info!(
        service = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        log_dir = %settings.dir,
        "Logging initialized"
    );
    guard
}
