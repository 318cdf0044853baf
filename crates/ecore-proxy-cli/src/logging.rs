//! Tracing setup

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Install the global subscriber; later calls do nothing.
///
/// Filters come from `ECORE_PROXY_LOG` (e.g. `ecore_proxy=trace`), with
/// `ecore_proxy=info` as the fallback.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("ECORE_PROXY_LOG")
            .unwrap_or_else(|_| EnvFilter::new("ecore_proxy=info"));

        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    });
}
