//! Plain-text transcript log.
//!
//! Entries are appended as they complete: user prompts, finished narrative
//! text, rendered surfaces and system errors. Each entry ends with a blank
//! line, matching what the terminal shows.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct TranscriptLog {
    file_path: Option<PathBuf>,
    is_active: bool,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_log_file(&mut self, path: impl Into<PathBuf>) -> Result<String, std::io::Error> {
        let path = path.into();
        // Fail now rather than on the first entry.
        OpenOptions::new().create(true).append(true).open(&path)?;

        let message = format!("Logging enabled to: {}", path.display());
        self.file_path = Some(path);
        self.is_active = true;
        Ok(message)
    }

    pub fn toggle(&mut self) -> Result<String, String> {
        let Some(path) = &self.file_path else {
            return Err("No log file specified. Use /log <filename> to enable logging first.".into());
        };
        self.is_active = !self.is_active;
        Ok(if self.is_active {
            format!("Logging resumed to: {}", path.display())
        } else {
            format!("Logging paused (file: {})", path.display())
        })
    }

    pub fn is_active(&self) -> bool {
        self.is_active && self.file_path.is_some()
    }

    pub fn log_user(&self, prompt: &str) -> Result<(), std::io::Error> {
        self.log_message(&format!("You: {prompt}"))
    }

    pub fn log_error(&self, message: &str) -> Result<(), std::io::Error> {
        self.log_message(&format!("## {message}"))
    }

    pub fn log_message(&self, content: &str) -> Result<(), std::io::Error> {
        match &self.file_path {
            Some(path) if self.is_active => write_entry(path, content),
            _ => Ok(()),
        }
    }

    pub fn status(&self) -> String {
        let file_name = |path: &Path| {
            path.file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned()
        };
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), true) => format!("active ({})", file_name(path)),
            (Some(path), false) => format!("paused ({})", file_name(path)),
        }
    }
}

fn write_entry(path: &Path, content: &str) -> Result<(), std::io::Error> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::with_capacity(64 * 1024, file);
    for line in content.lines() {
        writeln!(writer, "{line}")?;
    }
    writeln!(writer)?;
    writer.flush()
}
