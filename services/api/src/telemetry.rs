//! services/api/src/telemetry.rs
//!
//! Tracing subscriber setup. The configured level seeds the `EnvFilter`; `LOG_FORMAT`
//! picks human-readable or JSON output.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, LogFormat};

pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::new(format!(
        "{},tower_http=info,sqlx=warn",
        config.log_level.as_str().to_lowercase()
    ));

    let (pretty, json) = match config.log_format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer().with_target(true)), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .init();
}
