use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "h2h_predictor=info";

/// Logs go to stderr so stdout stays machine-readable JSON. `RUST_LOG` overrides the filter.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
