//! Tracing initialisation for covwatch binaries.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Initialise the global tracing subscriber.
///
/// `level` is the default verbosity when `RUST_LOG` is not set; `json`
/// switches to newline-delimited JSON log lines. Safe to call more than
/// once — only the first call takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let format = fmt::layer().with_target(false);
    let format = if json {
        format.json().boxed()
    } else {
        format.boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(format)
        .try_init()
        .ok();
}
