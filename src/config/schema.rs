//! Configuration schema for the chat history core.
//!
//! This module defines the configuration structure and validation logic for
//! all user-configurable settings.

use serde::{Deserialize, Serialize};

/// Main configuration structure.
///
/// All settings can be supplied under the "chat-history" key of the host
/// application's settings. Missing settings fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistoryConfig {
    /// Storage key holding the serialized history.
    ///
    /// Defaults to "chat-history". Must be non-empty and use only ASCII
    /// letters, digits, `-`, `_` and `.`.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Directory for file-backed storage.
    ///
    /// When unset, `~/.config/chat-history` is used.
    #[serde(default)]
    pub storage_dir: Option<String>,

    /// Maximum number of characters in a history sidebar label.
    ///
    /// Longer prompts are cut at a character boundary and get the ellipsis
    /// appended. Defaults to 40. Must be greater than 0.
    #[serde(default = "default_label_max_chars")]
    pub label_max_chars: usize,

    /// Marker appended to truncated labels. Defaults to "...".
    #[serde(default = "default_label_ellipsis")]
    pub label_ellipsis: String,

    /// Model selector sent with each generation request.
    ///
    /// Defaults to "gemini-2.0-flash". Must not be blank.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Whether to ask the service to ground answers with web search.
    ///
    /// Grounded answers come back with citations. Defaults to false.
    #[serde(default)]
    pub use_search_grounding: bool,

    /// Whether a new submission is accepted while another is in flight.
    ///
    /// Defaults to false: the submit action is locked until the pending
    /// request completes or is cancelled.
    #[serde(default)]
    pub allow_concurrent_requests: bool,
}

impl Default for ChatHistoryConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            storage_dir: None,
            label_max_chars: default_label_max_chars(),
            label_ellipsis: default_label_ellipsis(),
            default_model: default_model(),
            use_search_grounding: false,
            allow_concurrent_requests: false,
        }
    }
}

impl ChatHistoryConfig {
    /// Validates the configuration and returns errors if any settings are invalid.
    ///
    /// # Returns
    ///
    /// `Ok(())` if all settings are valid, or `Err` with a descriptive error message.
    pub fn validate(&self) -> Result<(), String> {
        if self.storage_key.is_empty()
            || self.storage_key.starts_with('.')
            || !self
                .storage_key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(format!("storageKey is not a valid key: {:?}", self.storage_key));
        }

        if self.label_max_chars == 0 {
            return Err("labelMaxChars must be greater than 0".to_string());
        }

        if self.default_model.trim().is_empty() {
            return Err("defaultModel must not be empty".to_string());
        }

        if let Some(dir) = &self.storage_dir {
            if dir.trim().is_empty() {
                return Err("storageDir must not be empty when set".to_string());
            }
        }

        Ok(())
    }

    /// Merges this configuration with another, using values from `other` where present.
    ///
    /// Optional settings keep this configuration's value when `other` leaves
    /// them unset.
    pub fn merge(&self, other: &ChatHistoryConfig) -> Self {
        Self {
            storage_key: other.storage_key.clone(),
            storage_dir: other.storage_dir.clone().or_else(|| self.storage_dir.clone()),
            label_max_chars: other.label_max_chars,
            label_ellipsis: other.label_ellipsis.clone(),
            default_model: other.default_model.clone(),
            use_search_grounding: other.use_search_grounding,
            allow_concurrent_requests: other.allow_concurrent_requests,
        }
    }
}

// Default value functions for serde

fn default_storage_key() -> String {
    crate::history::storage::DEFAULT_STORAGE_KEY.to_string()
}

fn default_label_max_chars() -> usize {
    crate::history::projector::DEFAULT_LABEL_MAX_CHARS
}

fn default_label_ellipsis() -> String {
    crate::history::projector::DEFAULT_LABEL_ELLIPSIS.to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}
