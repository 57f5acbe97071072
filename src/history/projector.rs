//! Display projection of the history.
//!
//! The projector turns the stored records and the current selection into the
//! ordered list a history sidebar renders. It is a pure function of its
//! inputs, so it can run on every render and is tested without any UI.

use super::ids::compare_ids;
use super::models::Record;
use super::selection::Selection;
use crate::config::ChatHistoryConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;

/// Default maximum number of characters in a display label.
pub const DEFAULT_LABEL_MAX_CHARS: usize = 40;

/// Default marker appended to truncated labels.
pub const DEFAULT_LABEL_ELLIPSIS: &str = "...";

/// One row of the projected history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedItem {
    pub id: String,
    pub display_label: String,
    pub is_active: bool,
}

/// Restricts which records appear in a projection.
///
/// The default filter lets everything through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    /// Case-insensitive substring matched against prompt, response and citations.
    pub query: Option<String>,

    /// Only records created at or after this instant.
    pub since: Option<DateTime<Utc>>,

    /// Maximum number of items, applied after ordering.
    pub limit: Option<usize>,
}

impl HistoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the search query. A blank query matches everything.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Checks if a record passes the query and time bound.
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(since) = self.since {
            if record.created_at < since {
                return false;
            }
        }

        match self.query.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => matches_query(record, &query.to_lowercase()),
            _ => true,
        }
    }
}

/// Checks if a record matches a lowercase search query in any text field.
fn matches_query(record: &Record, query_lower: &str) -> bool {
    if record.prompt.to_lowercase().contains(query_lower) {
        return true;
    }

    if record.response.to_lowercase().contains(query_lower) {
        return true;
    }

    record.sources.iter().any(|source| {
        source.title.to_lowercase().contains(query_lower)
            || source.uri.to_lowercase().contains(query_lower)
    })
}

/// Derives display-ready history items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryProjector {
    label_max_chars: usize,
    ellipsis: String,
}

impl Default for HistoryProjector {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL_MAX_CHARS, DEFAULT_LABEL_ELLIPSIS)
    }
}

impl HistoryProjector {
    /// Creates a projector with the given label bound and ellipsis marker.
    ///
    /// A bound of zero is treated as one so labels are never empty.
    pub fn new(label_max_chars: usize, ellipsis: impl Into<String>) -> Self {
        Self {
            label_max_chars: label_max_chars.max(1),
            ellipsis: ellipsis.into(),
        }
    }

    /// Creates a projector from the label settings in `config`.
    pub fn from_config(config: &ChatHistoryConfig) -> Self {
        Self::new(config.label_max_chars, config.label_ellipsis.clone())
    }

    pub fn label_max_chars(&self) -> usize {
        self.label_max_chars
    }

    /// Projects every record, newest first.
    pub fn project(&self, records: &[Record], selection: &Selection) -> Vec<ProjectedItem> {
        self.project_filtered(records, selection, &HistoryFilter::default())
    }

    /// Projects the records accepted by `filter`, newest first.
    pub fn project_filtered(
        &self,
        records: &[Record],
        selection: &Selection,
        filter: &HistoryFilter,
    ) -> Vec<ProjectedItem> {
        let limit = filter.limit.unwrap_or(usize::MAX);

        sort_newest_first(records)
            .into_iter()
            .filter(|record| filter.matches(record))
            .take(limit)
            .map(|record| ProjectedItem {
                id: record.id.clone(),
                display_label: self.display_label(&record.prompt),
                is_active: selection.is_viewing(&record.id),
            })
            .collect()
    }

    /// Builds the sidebar label for a prompt.
    pub fn display_label(&self, prompt: &str) -> String {
        truncate_label(prompt, self.label_max_chars, &self.ellipsis)
    }
}

/// Orders records by creation time, newest first, ties broken by id descending.
pub fn sort_newest_first(records: &[Record]) -> Vec<&Record> {
    let mut sorted: Vec<&Record> = records.iter().collect();
    sorted.sort_by(|a, b| newest_first(a, b));
    sorted
}

fn newest_first(a: &Record, b: &Record) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| compare_ids(&b.id, &a.id))
}

/// Collapses whitespace and truncates to `max_chars` characters.
///
/// Counts `char`s, so a multi-byte character is never split. The ellipsis is
/// appended only when something was cut off.
pub fn truncate_label(text: &str, max_chars: usize, ellipsis: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }

    let mut label: String = collapsed.chars().take(max_chars).collect();
    let trimmed_len = label.trim_end().len();
    label.truncate(trimmed_len);
    label.push_str(ellipsis);
    label
}
