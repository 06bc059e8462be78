use tracing_subscriber::{EnvFilter, prelude::*};

/// Install the stderr subscriber used by the binary.
///
/// Respects RUST_LOG, otherwise falls back to `default_filter`. Stdout is
/// left alone because the request loop writes responses there.
pub fn init_tracing(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::debug!(filter = default_filter, "tracing initialized");
}
