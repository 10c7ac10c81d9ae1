//! Opt-in log output
//!
//! The engine runs inside a host process that usually owns its own logging,
//! so nothing is installed unless the options carry `log_level` or
//! `PENNANT_LOG` is set. A subscriber the host installed first always wins.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Environment variable read when the options carry no `log_level`
pub const LOG_ENV: &str = "PENNANT_LOG";

static INIT: Once = Once::new();

/// Install a stderr subscriber once per process
pub fn init(level: Option<&str>) {
    let directive = match level {
        Some(level) => level.to_string(),
        None => match std::env::var(LOG_ENV) {
            Ok(directive) => directive,
            Err(_) => return,
        },
    };

    INIT.call_once(|| {
        let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();

        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            tracing::debug!(filter = %directive, "Engine logging enabled");
        }
    });
}
