use tracing_subscriber::EnvFilter;

/// Log to stderr, filtered by `RUST_LOG` (default: warnings, plus dbbind at info).
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,dbbind=info"));

    // A subscriber may already be installed when `run` is called from tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
