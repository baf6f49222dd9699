// DANS : src/monitoring/logging.rs

use tracing_subscriber::EnvFilter;

/// Initialise le logging global du processus. Le filtre lit la variable
/// RUST_LOG et retombe sur "info" si elle n'est pas définie.
pub fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
