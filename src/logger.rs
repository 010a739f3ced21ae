// Flowsmith: Structured logging via tracing

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Logs go to stderr. Level is controlled by the `FLOWSMITH_LOG` env var
/// (default: `info`). Examples:
///   FLOWSMITH_LOG=debug
///   FLOWSMITH_LOG=flowsmith::provider=debug,warn
pub fn init() {
    let filter =
        EnvFilter::try_from_env("FLOWSMITH_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

/// Initialize logger for tests (does not panic if called multiple times).
#[cfg(test)]
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
