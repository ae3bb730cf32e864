//! Diagnostic logging setup
//!
//! The evaluator and front end emit `tracing` events; nothing is printed
//! unless `EMBER_LOG` holds a filter such as `ember=debug` or
//! `ember::interp=trace`.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "EMBER_LOG";

static TRACING_INIT: Once = Once::new();

/// Install the global subscriber, once per process.
///
/// Logs go to stderr so they never mix with program output.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let Ok(directives) = std::env::var(LOG_ENV) else {
            return;
        };
        let filter = EnvFilter::builder().parse_lossy(directives);
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(filter)
            .init();
    });
}
