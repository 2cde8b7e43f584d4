//! Helper functions for settings operations.

use crate::core::config::data::Config;
use crate::core::config::ConfigOrchestrator;
use crate::ui::theme::Theme;

use super::error::SettingError;

/// Runs `f` through the orchestrator, mapping failures to
/// `SettingError::ConfigError`, and returns `message` on success.
pub fn mutate_config_with_message<F>(
    orchestrator: &ConfigOrchestrator,
    f: F,
    message: String,
) -> Result<String, SettingError>
where
    F: FnOnce(&mut Config) -> Result<(), Box<dyn std::error::Error>>,
{
    orchestrator
        .mutate(f)
        .map_err(|e| SettingError::ConfigError(e.to_string()))?;
    Ok(message)
}

pub fn success_set(key: &str, value: &str) -> String {
    format!("✅ Set {key} to: {value}")
}

pub fn success_unset(key: &str) -> String {
    format!("✅ Unset {key}")
}

/// Parse a boolean value from user input.
///
/// Accepts: on/off, true/false, yes/no (case-insensitive).
pub fn parse_bool(input: &str) -> Option<bool> {
    match input.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Format a boolean value for display.
pub fn format_bool(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Resolve a theme name or alias to its canonical name.
pub fn validate_theme(input: &str) -> Result<&'static str, SettingError> {
    Theme::from_name(input)
        .map(|theme| theme.name)
        .ok_or_else(|| SettingError::UnknownTheme {
            input: input.to_string(),
        })
}
