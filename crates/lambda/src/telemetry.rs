use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber, filtered by `RUST_LOG` (default `info`).
///
/// CloudWatch renders escape codes literally, so the Lambda binary passes
/// `ansi = false`.
pub fn init_tracing(ansi: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(ansi)
        .with_target(false)
        .init();
}
