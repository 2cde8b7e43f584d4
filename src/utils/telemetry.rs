//! Installs the global `tracing` subscriber for the binary.

use std::io::{self, IsTerminal};

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Filter precedence: `RUST_LOG`, then `configured`, then `warn`.
pub fn filter_directive(env_value: Option<&str>, configured: Option<&str>) -> String {
    [env_value, configured]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|directive| !directive.is_empty())
        .unwrap_or("warn")
        .to_string()
}

/// Logs go to stderr so they never interleave with the transcript on stdout.
/// An invalid directive falls back to `warn` and is reported once.
pub fn init(configured: Option<&str>) {
    let env_value = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = filter_directive(env_value.as_deref(), configured);
    let (filter, invalid) = match EnvFilter::try_new(&directive) {
        Ok(filter) => (filter, None),
        Err(err) => (EnvFilter::new("warn"), Some(err.to_string())),
    };

    let installed = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .try_init();

    if installed.is_ok() {
        if let Some(err) = invalid {
            tracing::warn!(directive = %directive, error = %err, "invalid log filter, using warn");
        }
    }
}
