//! Log output for the CLI.
//!
//! Logs go to stderr so JSON on stdout stays machine-readable. The filter is
//! read from `BLACKHOLE_LOG` (e.g. `BLACKHOLE_LOG=blackhole_core=debug`) and
//! defaults to warnings only.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const FILTER_ENV: &str = "BLACKHOLE_LOG";

pub fn init() {
    let filter = EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init();
}
