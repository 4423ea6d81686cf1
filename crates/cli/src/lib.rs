//! Public library modules for the CLI crate
pub mod output;
pub mod server;
pub mod watch;

use tracing_subscriber::EnvFilter;

/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
