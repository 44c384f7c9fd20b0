//! Persisted user settings.
//!
//! Settings live in a flat string key-value store. A file-backed store keeps
//! them as a JSON object and an in-memory store serves tests and one-off runs.

use std::collections::BTreeMap;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::telemetry::DEFAULT_PORT;

pub const KEY_TELEMETRY_ENABLED: &str = "telemetry_enabled";
pub const KEY_TELEMETRY_PORT: &str = "telemetry_port";
pub const KEY_LAST_DEVICE: &str = "last_device";
pub const KEY_AUTO_RECONNECT: &str = "auto_reconnect";

/// Ports accepted for the telemetry target.
pub const TELEMETRY_PORT_RANGE: RangeInclusive<u16> = 1024..=65535;

/// Settings errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Port {0} is outside 1024-65535")]
    PortOutOfRange(i64),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Flat string key-value store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> SettingsResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> SettingsResult<()>;
    fn remove(&self, key: &str) -> SettingsResult<()>;
}

/// In-memory store for testing and ephemeral use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> SettingsResult<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|e| SettingsError::Other(format!("Lock error: {}", e)))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SettingsResult<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| SettingsError::Other(format!("Lock error: {}", e)))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> SettingsResult<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| SettingsError::Other(format!("Lock error: {}", e)))?;
        values.remove(key);
        Ok(())
    }
}

/// JSON-file store. Every write rewrites the whole file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or start) the store at `path`. A missing file is an empty store.
    pub fn open(path: PathBuf) -> SettingsResult<Self> {
        let values = if path.exists() {
            let json = fs::read_to_string(&path)
                .map_err(|e| SettingsError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
            serde_json::from_str(&json).map_err(|e| {
                SettingsError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Open the store in the default location.
    ///
    /// On Unix: `~/.config/airsketch/settings.json`
    /// On Windows: `%APPDATA%\airsketch\settings.json`
    pub fn default_location() -> SettingsResult<Self> {
        let base = dirs::config_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| SettingsError::Io("Could not determine home directory".to_string()))?;
        Self::open(base.join("airsketch").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> SettingsResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::Io(format!("Failed to create settings directory: {}", e))
            })?;
        }
        let json = serde_json::to_string_pretty(values)
            .map_err(|e| SettingsError::Serialization(e.to_string()))?;
        fs::write(&self.path, json)
            .map_err(|e| SettingsError::Io(format!("Failed to write {}: {}", self.path.display(), e)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> SettingsResult<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|e| SettingsError::Other(format!("Lock error: {}", e)))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SettingsResult<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| SettingsError::Other(format!("Lock error: {}", e)))?;
        values.insert(key.to_string(), value.to_string());
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> SettingsResult<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| SettingsError::Other(format!("Lock error: {}", e)))?;
        values.remove(key);
        self.flush(&values)
    }
}

/// Validate user input for the telemetry port.
pub fn parse_telemetry_port(input: &str) -> SettingsResult<u16> {
    let value: i64 = input.trim().parse().map_err(|_| SettingsError::InvalidValue {
        key: KEY_TELEMETRY_PORT.to_string(),
        value: input.to_string(),
    })?;
    u16::try_from(value)
        .ok()
        .filter(|port| TELEMETRY_PORT_RANGE.contains(port))
        .ok_or(SettingsError::PortOutOfRange(value))
}

/// User settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub telemetry_enabled: bool,
    pub telemetry_port: u16,
    pub last_device: Option<String>,
    pub auto_reconnect: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            telemetry_enabled: false,
            telemetry_port: DEFAULT_PORT,
            last_device: None,
            auto_reconnect: true,
        }
    }
}

impl Settings {
    /// Read settings, falling back to defaults for missing or unreadable entries.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let defaults = Self::default();
        let read = |key: &str| match store.get(key) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Failed to read setting {key}: {e}");
                None
            }
        };

        let telemetry_port = match read(KEY_TELEMETRY_PORT) {
            Some(raw) => parse_telemetry_port(&raw).unwrap_or_else(|e| {
                log::warn!("Ignoring stored telemetry port: {e}");
                defaults.telemetry_port
            }),
            None => defaults.telemetry_port,
        };

        Self {
            telemetry_enabled: read(KEY_TELEMETRY_ENABLED)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.telemetry_enabled),
            telemetry_port,
            last_device: read(KEY_LAST_DEVICE).filter(|v| !v.is_empty()),
            auto_reconnect: read(KEY_AUTO_RECONNECT)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.auto_reconnect),
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> SettingsResult<()> {
        store.set(KEY_TELEMETRY_ENABLED, &self.telemetry_enabled.to_string())?;
        store.set(KEY_TELEMETRY_PORT, &self.telemetry_port.to_string())?;
        store.set(KEY_AUTO_RECONNECT, &self.auto_reconnect.to_string())?;
        match &self.last_device {
            Some(device) => store.set(KEY_LAST_DEVICE, device),
            None => store.remove(KEY_LAST_DEVICE),
        }
    }

    /// Apply a port typed by the user. On rejection the previous port stays.
    pub fn set_telemetry_port(&mut self, input: &str) -> SettingsResult<u16> {
        let port = parse_telemetry_port(input)?;
        self.telemetry_port = port;
        Ok(port)
    }

    pub fn remember_device(&mut self, device_id: &str) {
        log::info!("Saved last pen: {device_id}");
        self.last_device = Some(device_id.to_string());
    }

    /// Whether startup should offer to reconnect to the remembered pen.
    pub fn should_prompt_reconnect(&self) -> bool {
        self.auto_reconnect && self.last_device.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_from_empty_store() {
        let store = MemoryStore::new();
        let settings = Settings::load(&store);
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.telemetry_port, 9000);
        assert!(!settings.should_prompt_reconnect());
    }

    #[test]
    fn test_port_validation() {
        assert_eq!(parse_telemetry_port("9001").unwrap(), 9001);
        assert_eq!(parse_telemetry_port(" 1024 ").unwrap(), 1024);
        assert_eq!(parse_telemetry_port("65535").unwrap(), 65535);
        assert!(matches!(parse_telemetry_port("1023"), Err(SettingsError::PortOutOfRange(1023))));
        assert!(matches!(parse_telemetry_port("70000"), Err(SettingsError::PortOutOfRange(70000))));
        assert!(matches!(parse_telemetry_port("-5"), Err(SettingsError::PortOutOfRange(-5))));
        assert!(matches!(parse_telemetry_port("abc"), Err(SettingsError::InvalidValue { .. })));
    }

    #[test]
    fn test_rejected_port_keeps_previous() {
        let mut settings = Settings::default();
        settings.set_telemetry_port("12000").unwrap();
        assert!(settings.set_telemetry_port("80").is_err());
        assert_eq!(settings.telemetry_port, 12000);
    }

    #[test]
    fn test_memory_roundtrip() {
        let store = MemoryStore::new();
        let mut settings = Settings::default();
        settings.telemetry_enabled = true;
        settings.remember_device("AA:BB:CC");
        settings.save(&store).unwrap();

        let loaded = Settings::load(&store);
        assert_eq!(loaded, settings);
        assert!(loaded.should_prompt_reconnect());
    }

    #[test]
    fn test_invalid_stored_port_falls_back() {
        let store = MemoryStore::new();
        store.set(KEY_TELEMETRY_PORT, "99").unwrap();
        store.set(KEY_TELEMETRY_ENABLED, "yes please").unwrap();

        let settings = Settings::load(&store);
        assert_eq!(settings.telemetry_port, DEFAULT_PORT);
        assert!(!settings.telemetry_enabled);
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let store = FileStore::open(path.clone()).unwrap();
        let mut settings = Settings::default();
        settings.set_telemetry_port("9100").unwrap();
        settings.save(&store).unwrap();
        assert!(path.exists());

        let reopened = FileStore::open(path).unwrap();
        assert_eq!(Settings::load(&reopened).telemetry_port, 9100);
    }

    #[test]
    fn test_forgetting_device_removes_key() {
        let store = MemoryStore::new();
        let mut settings = Settings::default();
        settings.remember_device("pen");
        settings.save(&store).unwrap();

        settings.last_device = None;
        settings.save(&store).unwrap();
        assert_eq!(store.get(KEY_LAST_DEVICE).unwrap(), None);
    }
}
