//! Logging Infrastructure
//!
//! `RUST_LOG` overrides the configured level. When `log_dir` exists, output
//! goes to a daily rolling file instead of stdout.

use std::path::Path;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the logger with optional JSON and file output
pub fn init_logger_with_file(log_level: Option<&str>, json: Option<bool>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let json = json.unwrap_or(false);

    let file_dir = log_dir
        .map(Path::new)
        .filter(|p| p.exists())
        .and_then(|p| p.to_str());

    let registry = tracing_subscriber::registry().with(filter);

    // try_init: tests may initialise more than once
    let result = match (file_dir, json) {
        (Some(dir), true) => {
            let appender = tracing_appender::rolling::daily(dir, "citywatch-server");
            registry
                .with(fmt::layer().json().with_writer(appender))
                .try_init()
        }
        (Some(dir), false) => {
            let appender = tracing_appender::rolling::daily(dir, "citywatch-server");
            registry
                .with(fmt::layer().with_ansi(false).with_writer(appender))
                .try_init()
        }
        (None, true) => registry.with(fmt::layer().json()).try_init(),
        (None, false) => registry
            .with(fmt::layer().with_target(false).with_line_number(false))
            .try_init(),
    };

    if let Err(e) = result {
        eprintln!("logger already initialised: {e}");
    }
}
