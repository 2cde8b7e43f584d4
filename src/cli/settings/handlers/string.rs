//! String setting handlers for text-based settings.

use tracing_subscriber::EnvFilter;

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{mutate_config_with_message, success_set};
use crate::cli::settings::{SetContext, SettingHandler};
use crate::core::config::data::Config;
use crate::core::config::defaults::{DEFAULT_LOG_FILTER, DEFAULT_SERVER_URL};
use crate::utils::url::validate_server_url;

/// Data-driven handler for free-text settings with an optional validator.
pub struct StringHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    /// Shown when unset.
    default_display: &'static str,
    get: fn(&Config) -> Option<&str>,
    set_field: fn(&mut Config, Option<String>),
    /// Returns the value to store, or why the input is rejected.
    validate: fn(&str) -> Result<String, String>,
}

impl SettingHandler for StringHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, args: &[String], ctx: &SetContext<'_>) -> Result<String, SettingError> {
        if args.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: self.hint,
                example: self.example,
            });
        }

        let input = args.join(" ");
        let value = (self.validate)(&input).map_err(|reason| SettingError::InvalidValue {
            key: self.key,
            input: input.clone(),
            reason,
        })?;
        let message = success_set(self.key, &truncate_with_ellipsis(&value, 50));
        let set_field = self.set_field;

        mutate_config_with_message(
            ctx.orchestrator,
            move |config| {
                set_field(config, Some(value));
                Ok(())
            },
            message,
        )
    }

    fn unset(&self, ctx: &SetContext<'_>) -> Result<String, SettingError> {
        let set_field = self.set_field;

        mutate_config_with_message(
            ctx.orchestrator,
            move |config| {
                set_field(config, None);
                Ok(())
            },
            format!(
                "✅ Unset {} (will use default: {})",
                self.key, self.default_display
            ),
        )
    }

    fn format(&self, config: &Config) -> String {
        match (self.get)(config) {
            Some(value) => format!("  {}: {}", self.key, truncate_with_ellipsis(value, 50)),
            None => format!("  {}: (unset, default: {})", self.key, self.default_display),
        }
    }
}

/// Truncate a string to `max_chars` characters, appending "..." if truncated.
fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{truncated}...")
    } else {
        truncated
    }
}

fn non_empty(input: &str) -> Result<String, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        Err("Value must not be empty".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

fn valid_filter(input: &str) -> Result<String, String> {
    let directive = non_empty(input)?;
    EnvFilter::try_new(&directive)
        .map(|_| directive)
        .map_err(|err| err.to_string())
}

/// Create a handler for the `server-url` setting.
pub fn server_url_handler() -> StringHandler {
    StringHandler {
        key: "server-url",
        hint: "To set the chat server, provide its base URL:",
        example: "a2ui-term set server-url http://127.0.0.1:8000",
        default_display: DEFAULT_SERVER_URL,
        get: |c| c.server_url.as_deref(),
        set_field: |c, v| c.server_url = v,
        validate: validate_server_url,
    }
}

/// Create a handler for the `action-text` setting.
pub fn action_text_handler() -> StringHandler {
    StringHandler {
        key: "action-text",
        hint: "To set the text sent with button actions, provide it:",
        example: "a2ui-term set action-text \"Button pressed\"",
        default_display: "the action name",
        get: |c| c.action_text.as_deref(),
        set_field: |c, v| c.action_text = v,
        validate: non_empty,
    }
}

/// Create a handler for the `log-filter` setting.
pub fn log_filter_handler() -> StringHandler {
    StringHandler {
        key: "log-filter",
        hint: "To set the diagnostics filter, provide a tracing directive:",
        example: "a2ui-term set log-filter a2ui_term=debug",
        default_display: DEFAULT_LOG_FILTER,
        get: |c| c.log_filter.as_deref(),
        set_field: |c, v| c.log_filter = v,
        validate: valid_filter,
    }
}
