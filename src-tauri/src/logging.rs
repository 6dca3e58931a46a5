//! Console logging for the desktop shell.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Installs the console subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info` in release builds and
/// `debug` in debug builds.
pub fn setup(is_production: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if is_production {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("debug")
        }
    });

    let console_layer = fmt::layer().with_target(true).with_filter(filter);

    if tracing_subscriber::registry().with(console_layer).try_init().is_err() {
        return;
    }
    tracing::info!("Logging initialized (production={})", is_production);
}
