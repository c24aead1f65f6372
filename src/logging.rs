use tracing_subscriber::EnvFilter;

/// Filter used by the server when `RUST_LOG` is unset.
pub const SERVER_FILTER: &str = "info,tubeconv=debug";

/// Initialize structured logging to stderr. `RUST_LOG` overrides
/// `default_filter`.
pub fn init_logging(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
