use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;

use super::StoreError;
use crate::core::theme::Theme;

pub const APPS_KEY: &str = "apps";
pub const THEME_KEY: &str = "theme";

/// Synchronous string key-value store, one file per key under a directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Replace the value atomically: write a sibling temp file, then rename.
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(value.as_bytes()).map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;
        Ok(())
    }


    pub fn load_theme(&self) -> Theme {
        match self.get_item(THEME_KEY) {
            Ok(Some(value)) => Theme::parse(&value),
            Ok(None) => Theme::default(),
            Err(e) => {
                log::warn!("Failed to read theme, using default: {}", e);
                Theme::default()
            }
        }
    }

    pub fn save_theme(&self, theme: Theme) -> Result<(), StoreError> {
        self.set_item(THEME_KEY, theme.as_str())
    }
}
