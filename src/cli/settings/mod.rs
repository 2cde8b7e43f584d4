//! Settings management for CLI set/unset commands.
//!
//! Each configuration key has a handler; the shapes are:
//!
//! - Boolean settings (e.g., `markdown`, `stream`, `accept-widgets`)
//! - String settings with optional validation (e.g., `server-url`,
//!   `action-text`, `log-filter`)
//! - Theme, checked against the built-in theme names

pub mod error;
pub mod handlers;
pub mod helpers;
pub mod registry;

pub use error::SettingError;
pub use registry::SettingRegistry;

use crate::core::config::data::Config;
use crate::core::config::ConfigOrchestrator;

/// Context provided to setting handlers during set/unset operations.
pub struct SetContext<'a> {
    pub config: &'a Config,
    pub orchestrator: &'a ConfigOrchestrator,
}

/// Trait for handling a configuration setting.
///
/// Each implementation handles a specific configuration key,
/// providing set, unset, and format operations.
pub trait SettingHandler: Send + Sync {
    /// Returns the configuration key this handler manages.
    fn key(&self) -> &'static str;

    /// Set the configuration value from the words after the key.
    ///
    /// # Returns
    /// A success message to display, or an error.
    fn set(&self, args: &[String], ctx: &SetContext<'_>) -> Result<String, SettingError>;

    /// Unset (clear) the configuration value.
    fn unset(&self, ctx: &SetContext<'_>) -> Result<String, SettingError>;

    /// Format the current value for display in `a2ui-term set` output.
    fn format(&self, config: &Config) -> String;
}

#[cfg(test)]
mod tests;
