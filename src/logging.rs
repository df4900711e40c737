use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt};

static INIT_LOGGING: Once = Once::new();

/// Install the global stderr subscriber.
///
/// `RUST_LOG` takes precedence; otherwise only warnings are shown unless
/// `verbose` is set. Safe to call more than once.
pub fn init(verbose: bool) {
    INIT_LOGGING.call_once(|| {
        let default_level = if verbose { "fintrack=debug" } else { "fintrack=warn" };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));

        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    });
}
