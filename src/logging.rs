// ABOUTME: tracing subscriber setup writing compact records to stderr
// ABOUTME: KEYLAUNCH_LOG overrides the configured level with a full EnvFilter directive

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_ENV_VAR: &str = "KEYLAUNCH_LOG";

/// Installs the global subscriber. Later calls are ignored.
pub fn init(level: &str) {
    let filter = build_filter(std::env::var(LOG_ENV_VAR).ok().as_deref(), level);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init();
}

fn build_filter(env_directive: Option<&str>, level: &str) -> EnvFilter {
    if let Some(directive) = env_directive.filter(|d| !d.trim().is_empty()) {
        match EnvFilter::try_new(directive) {
            Ok(filter) => return filter,
            Err(e) => eprintln!("Ignoring invalid {LOG_ENV_VAR} directive '{directive}': {e}"),
        }
    }
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}
