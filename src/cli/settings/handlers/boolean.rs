//! Boolean setting handlers for on/off settings.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{format_bool, mutate_config_with_message, parse_bool};
use crate::cli::settings::{SetContext, SettingHandler};
use crate::core::config::data::Config;

/// Data-driven handler for boolean (on/off) settings.
pub struct BooleanHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    default_display: &'static str,
    get: fn(&Config) -> Option<bool>,
    set_field: fn(&mut Config, Option<bool>),
}

impl SettingHandler for BooleanHandler {
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
        let value = parse_bool(&input).ok_or(SettingError::InvalidBoolean(input))?;
        let set_field = self.set_field;

        mutate_config_with_message(
            ctx.orchestrator,
            move |config| {
                set_field(config, Some(value));
                Ok(())
            },
            format!("✅ Set {} to: {}", self.key, format_bool(value)),
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
            Some(value) => format!("  {}: {}", self.key, format_bool(value)),
            None => format!("  {}: (unset, default: {})", self.key, self.default_display),
        }
    }
}

/// Create a handler for the `accept-widgets` setting.
pub fn accept_widgets_handler() -> BooleanHandler {
    BooleanHandler {
        key: "accept-widgets",
        hint: "To choose whether the server may reply with widgets, specify on or off:",
        example: "a2ui-term set accept-widgets off",
        default_display: "on",
        get: |c| c.accept_widgets,
        set_field: |c, v| c.accept_widgets = v,
    }
}

/// Create a handler for the `markdown` setting.
pub fn markdown_handler() -> BooleanHandler {
    BooleanHandler {
        key: "markdown",
        hint: "To set markdown rendering, specify on or off:",
        example: "a2ui-term set markdown off",
        default_display: "on",
        get: |c| c.markdown,
        set_field: |c, v| c.markdown = v,
    }
}

/// Create a handler for the `stream` setting.
pub fn stream_handler() -> BooleanHandler {
    BooleanHandler {
        key: "stream",
        hint: "To choose streaming or single-reply turns, specify on or off:",
        example: "a2ui-term set stream off",
        default_display: "on",
        get: |c| c.stream,
        set_field: |c, v| c.stream = v,
    }
}
