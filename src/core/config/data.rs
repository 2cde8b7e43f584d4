use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted client settings. Every key is optional; see `defaults.rs` for
/// the effective values.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the chat server (e.g., "http://127.0.0.1:8000")
    pub server_url: Option<String>,
    /// Advertise widget support through the `X-Client-A2UI` header
    pub accept_widgets: Option<bool>,
    /// Enable markdown rendering of narrative text
    pub markdown: Option<bool>,
    /// Use the streaming endpoint for prompts
    pub stream: Option<bool>,
    /// UI theme name ("dark", "light", "monochrome")
    pub theme: Option<String>,
    /// Outgoing `text` for action requests
    pub action_text: Option<String>,
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub log_filter: Option<String>,
}

/// Get a user-friendly display string for a path
///
/// Converts absolute paths to use ~ notation on Unix-like systems when possible.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
