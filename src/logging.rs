use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
/// `RUST_LOG` wins when set, otherwise `info` (or `debug` when verbose).
/// Safe to call more than once; later calls are no-ops.
pub fn init(verbose: bool) {
    let base_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
