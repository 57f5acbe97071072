//! Configuration management for the chat history core.
//!
//! This module provides configuration loading, validation, and access through
//! a singleton. Configuration is read from the host settings under the
//! "chat-history" key and merged with defaults.

pub mod schema;

pub use schema::ChatHistoryConfig;

use crate::history::storage::{default_storage_dir, FileStorage, StorageError};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::RwLock;

/// Settings key holding this crate's configuration.
pub const SETTINGS_KEY: &str = "chat-history";

/// Global configuration instance.
///
/// Lazily initialized with defaults; replaced by `load_config`.
static CONFIG: Lazy<RwLock<ChatHistoryConfig>> =
    Lazy::new(|| RwLock::new(ChatHistoryConfig::default()));

/// Loads configuration from a settings JSON value.
///
/// Reads the "chat-history" settings, merges them with defaults, validates the
/// result, and updates the global configuration. Settings that fail to parse
/// are logged and replaced with defaults.
///
/// # Example
///
/// ```
/// use chat_history::config::load_config;
/// use serde_json::json;
///
/// let settings = json!({
///     "chat-history": {
///         "labelMaxChars": 24
///     }
/// });
///
/// let config = load_config(Some(settings)).unwrap();
/// assert_eq!(config.label_max_chars, 24);
/// # chat_history::config::reset_config();
/// ```
pub fn load_config(settings_json: Option<Value>) -> Result<ChatHistoryConfig, String> {
    let mut config = ChatHistoryConfig::default();

    if let Some(settings) = settings_json {
        if let Some(section) = settings.get(SETTINGS_KEY) {
            match serde_json::from_value::<ChatHistoryConfig>(section.clone()) {
                Ok(user_config) => {
                    config = config.merge(&user_config);
                }
                Err(e) => {
                    log::warn!(
                        "Failed to parse {} settings: {}. Using defaults.",
                        SETTINGS_KEY,
                        e
                    );
                }
            }
        }
    }

    config
        .validate()
        .map_err(|e| format!("Invalid configuration: {}. Using defaults.", e))?;

    if let Ok(mut global_config) = CONFIG.write() {
        *global_config = config.clone();
    }

    Ok(config)
}

/// Gets a copy of the current global configuration.
///
/// Returns the defaults if nothing has been loaded.
pub fn get_config() -> ChatHistoryConfig {
    CONFIG
        .read()
        .map(|c| c.clone())
        .unwrap_or_else(|_| ChatHistoryConfig::default())
}

/// Updates the global configuration in place.
///
/// If the result fails validation, the configuration reverts to defaults.
pub fn update_config<F>(updater: F)
where
    F: FnOnce(&mut ChatHistoryConfig),
{
    if let Ok(mut config) = CONFIG.write() {
        updater(&mut config);

        if let Err(e) = config.validate() {
            log::warn!("Configuration validation failed after update: {}", e);
            *config = ChatHistoryConfig::default();
        }
    }
}

/// Resets the global configuration to defaults.
pub fn reset_config() {
    if let Ok(mut config) = CONFIG.write() {
        *config = ChatHistoryConfig::default();
    }
}

/// Resolves the storage directory: the configured one, else the per-user default.
pub fn resolve_storage_dir(config: &ChatHistoryConfig) -> Result<PathBuf, StorageError> {
    match &config.storage_dir {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => default_storage_dir(),
    }
}

/// Builds file-backed storage from `config`.
pub fn file_storage(config: &ChatHistoryConfig) -> Result<FileStorage, StorageError> {
    Ok(FileStorage::new(resolve_storage_dir(config)?))
}
