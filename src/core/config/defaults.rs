use crate::core::config::data::Config;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_THEME: &str = "dark";
pub const DEFAULT_LOG_FILTER: &str = "warn";

impl Config {
    pub fn server_url(&self) -> &str {
        self.server_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_SERVER_URL)
    }

    pub fn accept_widgets(&self) -> bool {
        self.accept_widgets.unwrap_or(true)
    }

    pub fn markdown(&self) -> bool {
        self.markdown.unwrap_or(true)
    }

    pub fn stream(&self) -> bool {
        self.stream.unwrap_or(true)
    }

    pub fn theme(&self) -> &str {
        self.theme.as_deref().unwrap_or(DEFAULT_THEME)
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}
