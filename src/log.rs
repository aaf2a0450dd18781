use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `EGTB_LOG=debug`.
pub const LOG_ENV: &str = "EGTB_LOG";

/// Installs the global `fmt` subscriber. Falls back to `info` when `EGTB_LOG`
/// is unset or unparsable. Calling it twice is harmless.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
