//! Persisted user settings
//!
//! The only persisted setting is the global enabled toggle. It lives in
//! `$XDG_STATE_HOME/blameline/settings.toml`, separate from the hand-written
//! config file so toggling never rewrites user configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Get/set access to the enabled toggle.
pub trait SettingsStore: Send + Sync {
    fn enabled(&self) -> bool;
    fn set_enabled(&self, enabled: bool) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
}

/// Settings stored in a TOML file, falling back to a default when unset.
#[derive(Debug, Clone)]
pub struct TomlSettingsStore {
    path: PathBuf,
    default_enabled: bool,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>, default_enabled: bool) -> Self {
        Self {
            path: path.into(),
            default_enabled,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> PersistedSettings {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return PersistedSettings::default(),
        };
        toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unreadable settings file");
            PersistedSettings::default()
        })
    }
}

impl SettingsStore for TomlSettingsStore {
    fn enabled(&self) -> bool {
        self.read().enabled.unwrap_or(self.default_enabled)
    }

    fn set_enabled(&self, enabled: bool) -> Result<()> {
        let mut settings = self.read();
        settings.enabled = Some(enabled);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string(&settings)
            .map_err(|e| Error::Config(format!("failed to serialize settings: {}", e)))?;
        std::fs::write(&self.path, content)?;
        tracing::debug!(enabled, path = %self.path.display(), "Persisted enabled setting");
        Ok(())
    }
}

/// In-memory settings for tests and embedded hosts.
#[derive(Debug)]
pub struct MemorySettings {
    enabled: AtomicBool,
}

impl MemorySettings {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }
}

impl SettingsStore for MemorySettings {
    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.enabled.store(enabled, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_toml_store_defaults_when_missing() {
        let dir = TempDir::new().unwrap();
        let store = TomlSettingsStore::new(dir.path().join("settings.toml"), true);
        assert!(store.enabled());

        let store = TomlSettingsStore::new(dir.path().join("settings.toml"), false);
        assert!(!store.enabled());
    }

    #[test]
    fn test_toml_store_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/settings.toml");
        let store = TomlSettingsStore::new(&path, true);

        store.set_enabled(false).unwrap();
        assert!(!store.enabled());

        let reopened = TomlSettingsStore::new(&path, true);
        assert!(!reopened.enabled());
        assert!(std::fs::read_to_string(&path).unwrap().contains("enabled = false"));
    }

    #[test]
    fn test_toml_store_ignores_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "enabled = [").unwrap();

        let store = TomlSettingsStore::new(&path, true);
        assert!(store.enabled());
        store.set_enabled(false).unwrap();
        assert!(!store.enabled());
    }

    #[test]
    fn test_memory_settings() {
        let settings = MemorySettings::new(true);
        settings.set_enabled(false).unwrap();
        assert!(!settings.enabled());
    }
}
