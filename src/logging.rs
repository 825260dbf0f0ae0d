//! Log output for the CLI and server.
//!
//! `RUST_LOG` picks the filter (default `info`). `MIMI_LOG_JSON` set to `1` or
//! `true` emits one JSON object per line, otherwise human-readable output.
//! Everything goes to stderr so CLI results on stdout stay machine-parseable.

use tracing_subscriber::{fmt, EnvFilter};

const JSON_ENV: &str = "MIMI_LOG_JSON";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_flag(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("1") => LogFormat::Json,
            Some(v) if v.eq_ignore_ascii_case("true") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }

    pub fn from_env() -> Self {
        Self::from_flag(std::env::var(JSON_ENV).ok().as_deref())
    }
}

pub fn init_logging() {
    init_logging_as(LogFormat::from_env());
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_logging_as(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt::Subscriber::builder().with_env_filter(filter).with_writer(std::io::stderr);
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}
