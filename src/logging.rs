use tracing_subscriber::EnvFilter;

/// Install the global subscriber, writing to stderr. `RUST_LOG` wins over
/// `default_level`. Safe to call more than once; later calls are ignored.
pub fn init(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
