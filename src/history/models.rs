//! Data models for conversation history.
//!
//! This module defines the persisted [`Record`] of a finished prompt/response
//! exchange, its web-search citations, and the error type shared by the
//! history components.

use super::storage::StorageError;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A web-search citation attached to a response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    /// Location of the cited document.
    pub uri: String,

    /// Human-readable title. Some services omit it, so it defaults to empty.
    #[serde(default)]
    pub title: String,
}

impl Source {
    /// Creates a citation from a URI and a title.
    pub fn new(uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: title.into(),
        }
    }

    /// Returns the title, or the URI when the title is blank.
    pub fn label(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.uri
        } else {
            &self.title
        }
    }
}

/// One finished prompt/response exchange.
///
/// Records are immutable once created: the coordinator only hands out shared
/// references or clones, and there is no update operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredRecord")]
pub struct Record {
    /// Unique identifier within the store.
    ///
    /// Derived from the creation time in milliseconds, with a `-<seq>` suffix
    /// when several records share the same millisecond.
    pub id: String,

    /// The text the user submitted. Never blank.
    pub prompt: String,

    /// The text produced by the generation service.
    #[serde(default)]
    pub response: String,

    /// Ordered citations returned with the response.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,

    /// Creation time, stored as milliseconds since the Unix epoch.
    ///
    /// Written as `timestamp`. Older blobs used `createdAt`, so both names are
    /// read; `timestamp` wins when an element carries both.
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// On-disk shape of a [`Record`], with both accepted time field names.
#[derive(Deserialize)]
struct StoredRecord {
    id: String,
    prompt: String,
    #[serde(default)]
    response: String,
    #[serde(default)]
    sources: Vec<Source>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    timestamp: Option<DateTime<Utc>>,
    #[serde(
        default,
        rename = "createdAt",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<StoredRecord> for Record {
    type Error = String;

    fn try_from(stored: StoredRecord) -> Result<Self, Self::Error> {
        let created_at = stored
            .timestamp
            .or(stored.created_at)
            .ok_or_else(|| "missing field `timestamp`".to_string())?;

        Ok(Record {
            id: stored.id,
            prompt: stored.prompt,
            response: stored.response,
            sources: stored.sources,
            created_at,
        })
    }
}

/// Drops sub-millisecond precision, which the stored layout cannot hold.
pub fn truncate_to_millis(time: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(time.timestamp_millis())
        .single()
        .unwrap_or(time)
}

impl Record {
    /// Creates a record, rejecting a blank prompt.
    ///
    /// `created_at` is truncated to whole milliseconds so the record reads
    /// back unchanged after a save.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::InvalidRecord` if `prompt` is empty or
    /// whitespace only, or if `id` is empty.
    pub fn new(
        id: impl Into<String>,
        prompt: impl Into<String>,
        response: impl Into<String>,
        sources: Vec<Source>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, HistoryError> {
        let record = Self {
            id: id.into(),
            prompt: prompt.into(),
            response: response.into(),
            sources,
            created_at: truncate_to_millis(created_at),
        };
        record.validate()?;
        Ok(record)
    }

    /// Checks the structural rules every stored record must satisfy.
    pub fn validate(&self) -> Result<(), HistoryError> {
        if self.id.trim().is_empty() {
            return Err(HistoryError::InvalidRecord("id must not be empty".to_string()));
        }
        if self.prompt.trim().is_empty() {
            return Err(HistoryError::InvalidRecord(
                "prompt must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns `true` if the response came with at least one citation.
    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }

    /// Creation time in milliseconds since the Unix epoch.
    pub fn created_at_millis(&self) -> i64 {
        self.created_at.timestamp_millis()
    }
}

/// Errors that can occur during history operations.
#[derive(Debug)]
pub enum HistoryError {
    /// The persisted blob could not be parsed.
    ///
    /// Produced while decoding and absorbed by `RecordStore::load`, which
    /// treats the store as empty instead.
    CorruptPersistedData(serde_json::Error),

    /// The backing storage rejected a write (for example, quota exceeded).
    ///
    /// The in-memory effect of the operation still applies for the rest of
    /// the session.
    PersistenceWriteFailure(StorageError),

    /// The records could not be encoded for storage.
    SerializationError(serde_json::Error),

    /// A new record is kept for this session but could not be saved.
    ///
    /// Carries the record so the caller can still show and select it.
    RecordNotSaved {
        record: Box<Record>,
        cause: Box<HistoryError>,
    },

    /// No record with the given id exists.
    NotFound(String),

    /// A record failed validation.
    InvalidRecord(String),
}

impl HistoryError {
    /// Returns `true` when the in-memory state changed but storage did not.
    pub fn is_unsaved_change(&self) -> bool {
        matches!(
            self,
            HistoryError::PersistenceWriteFailure(_)
                | HistoryError::SerializationError(_)
                | HistoryError::RecordNotSaved { .. }
        )
    }

    /// The record that was kept in memory despite a failed save, if any.
    pub fn unsaved_record(&self) -> Option<&Record> {
        match self {
            HistoryError::RecordNotSaved { record, .. } => Some(record),
            _ => None,
        }
    }
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::CorruptPersistedData(err) => {
                write!(f, "Persisted history is corrupt: {}", err)
            }
            HistoryError::PersistenceWriteFailure(err) => {
                write!(
                    f,
                    "History could not be saved and may not survive a reload: {}",
                    err
                )
            }
            HistoryError::SerializationError(err) => {
                write!(f, "History serialization error: {}", err)
            }
            HistoryError::RecordNotSaved { record, cause } => write!(
                f,
                "History entry {} is kept for this session only: {}",
                record.id, cause
            ),
            HistoryError::NotFound(id) => write!(f, "History entry not found: {}", id),
            HistoryError::InvalidRecord(reason) => {
                write!(f, "Invalid history entry: {}", reason)
            }
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HistoryError::CorruptPersistedData(err) => Some(err),
            HistoryError::PersistenceWriteFailure(err) => Some(err),
            HistoryError::SerializationError(err) => Some(err),
            HistoryError::RecordNotSaved { cause, .. } => Some(cause.as_ref()),
            HistoryError::NotFound(_) | HistoryError::InvalidRecord(_) => None,
        }
    }
}

impl From<StorageError> for HistoryError {
    fn from(err: StorageError) -> Self {
        HistoryError::PersistenceWriteFailure(err)
    }
}
