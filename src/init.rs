use tracing_subscriber::EnvFilter;

/// Initialize tracing with RUST_LOG filtering; diagnostics go to stderr so
/// command output on stdout stays parseable.
pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
