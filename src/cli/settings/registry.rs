//! Registry of setting handlers.

use std::collections::HashMap;

use super::handlers::boolean::{accept_widgets_handler, markdown_handler, stream_handler};
use super::handlers::string::{action_text_handler, log_filter_handler, server_url_handler};
use super::handlers::ThemeHandler;
use super::SettingHandler;

/// Registry of all available setting handlers.
pub struct SettingRegistry {
    handlers: HashMap<&'static str, Box<dyn SettingHandler>>,
    /// Keys in display order for `a2ui-term set` output.
    display_order: Vec<&'static str>,
}

impl SettingRegistry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
            display_order: Vec::new(),
        };

        // Register handlers in display order
        registry.register(Box::new(server_url_handler()));
        registry.register(Box::new(accept_widgets_handler()));
        registry.register(Box::new(stream_handler()));
        registry.register(Box::new(markdown_handler()));
        registry.register(Box::new(ThemeHandler));
        registry.register(Box::new(action_text_handler()));
        registry.register(Box::new(log_filter_handler()));

        registry
    }

    fn register(&mut self, handler: Box<dyn SettingHandler>) {
        let key = handler.key();
        self.display_order.push(key);
        self.handlers.insert(key, handler);
    }

    /// Get a handler by key.
    pub fn get(&self, key: &str) -> Option<&dyn SettingHandler> {
        self.handlers.get(key).map(|h| h.as_ref())
    }

    /// Get all keys in display order.
    pub fn keys_display_order(&self) -> &[&'static str] {
        &self.display_order
    }
}

impl Default for SettingRegistry {
    fn default() -> Self {
        Self::new()
    }
}
