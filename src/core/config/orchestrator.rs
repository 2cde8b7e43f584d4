use crate::core::config::data::Config;
use crate::core::config::io::ConfigError;
use std::error::Error as StdError;
use std::path::{Path, PathBuf};

/// Loads and edits one config file.
///
/// Every mutation re-reads the file first so edits made by another process
/// between two `set` invocations are not lost.
#[derive(Debug, Clone)]
pub struct ConfigOrchestrator {
    path: PathBuf,
}

impl ConfigOrchestrator {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        Config::load_from_path(&self.path)
    }

    pub fn mutate<F, T>(&self, mutator: F) -> Result<T, Box<dyn StdError>>
    where
        F: FnOnce(&mut Config) -> Result<T, Box<dyn StdError>>,
    {
        let mut working = self.load()?;
        let result = mutator(&mut working)?;
        working.save_to_path(&self.path)?;
        Ok(result)
    }
}
