use tracing_subscriber::EnvFilter;

/// Initialize the global `tracing` subscriber.
///
/// Reads `GDBCTL_LOG` for the filter directive (falling back to `info`, or
/// `warn` when `quiet` is true), mirroring the `RUST_LOG`-style convention
/// the rest of this lineage uses.
pub fn init_logging(quiet: bool) {
    let default_directive = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_env("GDBCTL_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
