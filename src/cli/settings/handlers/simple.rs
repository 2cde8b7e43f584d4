//! Simple setting handlers for single-value settings.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{
    mutate_config_with_message, success_set, success_unset, validate_theme,
};
use crate::cli::settings::{SetContext, SettingHandler};
use crate::core::config::data::Config;
use crate::core::config::defaults::DEFAULT_THEME;

/// Handler for the `theme` setting.
pub struct ThemeHandler;

impl SettingHandler for ThemeHandler {
    fn key(&self) -> &'static str {
        "theme"
    }

    fn set(&self, args: &[String], ctx: &SetContext<'_>) -> Result<String, SettingError> {
        if args.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: "To set a theme, specify the theme name:",
                example: "a2ui-term set theme light",
            });
        }

        let theme = validate_theme(&args.join(" "))?;
        mutate_config_with_message(
            ctx.orchestrator,
            move |config| {
                config.theme = Some(theme.to_string());
                Ok(())
            },
            success_set("theme", theme),
        )
    }

    fn unset(&self, ctx: &SetContext<'_>) -> Result<String, SettingError> {
        mutate_config_with_message(
            ctx.orchestrator,
            |config| {
                config.theme = None;
                Ok(())
            },
            success_unset("theme"),
        )
    }

    fn format(&self, config: &Config) -> String {
        match &config.theme {
            Some(theme) => format!("  theme: {theme}"),
            None => format!("  theme: (unset, default: {DEFAULT_THEME})"),
        }
    }
}
