use tracing_subscriber::EnvFilter;

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`, defaulting to
/// `info`. Returns false when a global subscriber was already set.
pub fn init_logging() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .is_ok()
}
