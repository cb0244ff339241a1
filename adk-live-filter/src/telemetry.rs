//! Logging initialization.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Install a console subscriber filtered by `RUST_LOG` (default `info`).
///
/// Only the first call has an effect. If another global subscriber is already
/// installed it is left in place.
///
/// # Example
/// ```
/// adk_live_filter::telemetry::init_logging("duck-watch");
/// ```
pub fn init_logging(service_name: &str) {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).with_line_number(true))
            .try_init()
            .is_ok();

        if installed {
            tracing::info!(service.name = service_name, "Logging initialized");
        }
    });
}
