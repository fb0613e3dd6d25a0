/// Diagnostic logging setup
///
/// Library code only emits `tracing` events; the binary installs the
/// subscriber once. Output goes to stderr so stdout stays free for
/// command results such as a printed fingerprint.
use tracing_subscriber::EnvFilter;

/// Environment variable taking priority over `RUST_LOG`
pub const LOG_ENV: &str = "KC_LICENSOR_LOG";

/// Filter directive for a configured level; "none" silences everything
pub fn directive_for(level: &str) -> &'static str {
    match level.to_ascii_lowercase().as_str() {
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        "none" => "off",
        _ => "info",
    }
}

/// Build the filter: `KC_LICENSOR_LOG`, then `RUST_LOG`, then `level`
pub fn build_filter(level: &str) -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("⚠️  Invalid {} directive ({}), using '{}'", LOG_ENV, err, level);
            EnvFilter::new(directive_for(level))
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive_for(level))),
    }
}

/// Install the stderr subscriber; a second call is a no-op
pub fn init_logging(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
