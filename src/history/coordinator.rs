//! The single writer of history state.
//!
//! [`MutationCoordinator`] owns the in-memory records, the selection and the
//! backing [`RecordStore`]. Every create, delete and clear goes through it so
//! the selection can never point at a record that no longer exists.
//!
//! Write failures do not roll back the in-memory change: the operation takes
//! effect for the rest of the session, the error is returned so the caller can
//! warn that history may not survive a reload, and [`MutationCoordinator::flush`]
//! retries the write later.

use super::events::{ChangeNotifier, HistoryEvent, SubscriptionId};
use super::ids::IdGenerator;
use super::models::{HistoryError, Record, Source};
use super::projector::{HistoryFilter, HistoryProjector, ProjectedItem};
use super::selection::{Selection, SelectionTracker};
use super::storage::{KeyValueStorage, RecordStore};
use crate::config::ChatHistoryConfig;
use chrono::{DateTime, Utc};

/// Source of the current time, replaceable in tests.
pub type Clock = fn() -> DateTime<Utc>;

/// Owns history state and enforces its invariants.
#[derive(Debug)]
pub struct MutationCoordinator<S> {
    store: RecordStore<S>,
    records: Vec<Record>,
    selection: SelectionTracker,
    projector: HistoryProjector,
    ids: IdGenerator,
    notifier: ChangeNotifier,
    unsaved: bool,
    clock: Clock,
}

impl<S: KeyValueStorage> MutationCoordinator<S> {
    /// Starts a session from whatever `store` currently holds.
    pub fn open(store: RecordStore<S>, projector: HistoryProjector) -> Self {
        let records = store.load();
        log::debug!(
            "Loaded {} history entries from {:?}",
            records.len(),
            store.key()
        );

        Self {
            ids: IdGenerator::seeded_from(&records),
            store,
            records,
            selection: SelectionTracker::new(),
            projector,
            notifier: ChangeNotifier::new(),
            unsaved: false,
            clock: Utc::now,
        }
    }

    /// Starts a session using the storage key and label settings in `config`.
    pub fn from_config(storage: S, config: &ChatHistoryConfig) -> Self {
        Self::open(
            RecordStore::with_key(storage, config.storage_key.clone()),
            HistoryProjector::from_config(config),
        )
    }

    /// Replaces the clock used to timestamp new records.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Records a finished exchange and persists the whole history.
    ///
    /// Only call this with a complete response; partial or abandoned output
    /// must never be recorded.
    ///
    /// # Errors
    ///
    /// - `HistoryError::InvalidRecord` if `prompt` is blank. Nothing changes.
    /// - `HistoryError::RecordNotSaved` if the write fails. The record is still
    ///   kept in memory, listeners are still notified, and the error carries
    ///   the record so it can be shown and selected.
    pub fn record_completed_exchange(
        &mut self,
        prompt: impl Into<String>,
        response: impl Into<String>,
        sources: Vec<Source>,
    ) -> Result<Record, HistoryError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(HistoryError::InvalidRecord(
                "prompt must not be empty".to_string(),
            ));
        }

        let now = (self.clock)();
        let mut issued = self.ids.next(now);
        while self.contains(&issued.id) {
            issued = self.ids.next(now);
        }

        let record = Record::new(issued.id, prompt, response, sources, issued.created_at)?;
        self.records.push(record.clone());

        let written = self.write_snapshot();
        self.notifier.notify(&HistoryEvent::Recorded {
            id: record.id.clone(),
        });
        match written {
            Ok(()) => Ok(record),
            Err(cause) => Err(HistoryError::RecordNotSaved {
                record: Box::new(record),
                cause: Box::new(cause),
            }),
        }
    }

    /// Removes a record, clearing the selection if it pointed at it.
    ///
    /// Returns `Ok(false)` without writing when no record has this id, so
    /// repeated deletes are harmless.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::PersistenceWriteFailure` if the write fails;
    /// the record is removed from memory regardless.
    pub fn delete_entry(&mut self, id: &str) -> Result<bool, HistoryError> {
        let Some(position) = self.records.iter().position(|r| r.id == id) else {
            return Ok(false);
        };

        self.records.remove(position);
        let selection_cleared = self.selection.clear_if(id);

        let written = self.write_snapshot();
        self.notifier.notify(&HistoryEvent::Deleted {
            id: id.to_string(),
            selection_cleared,
        });
        written.map(|_| true)
    }

    /// Removes every record and resets the selection.
    ///
    /// Irreversible. Confirmation is the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::PersistenceWriteFailure` if the write fails;
    /// memory is cleared regardless.
    pub fn clear_all(&mut self) -> Result<(), HistoryError> {
        let removed = self.records.len();
        self.records.clear();
        self.selection.clear();

        let written = self.write_snapshot();
        self.notifier.notify(&HistoryEvent::Cleared { removed });
        written
    }

    /// Selects a record for display and returns a copy of it.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::NotFound` if no record has this id. The
    /// selection is left unchanged in that case.
    pub fn view(&mut self, id: &str) -> Result<Record, HistoryError> {
        let record = self
            .get(id)
            .cloned()
            .ok_or_else(|| HistoryError::NotFound(id.to_string()))?;

        self.selection.select(record.id.clone());
        self.notifier.notify(&HistoryEvent::Viewed {
            id: record.id.clone(),
        });
        Ok(record)
    }

    /// Returns to the idle "new chat" view without touching the records.
    pub fn new_chat(&mut self) {
        if self.selection.clear().is_some() {
            self.notifier.notify(&HistoryEvent::SelectionCleared);
        }
    }

    /// Retries the snapshot write after an earlier failure.
    ///
    /// Does nothing when memory and storage already agree.
    pub fn flush(&mut self) -> Result<(), HistoryError> {
        if !self.unsaved {
            return Ok(());
        }
        self.write_snapshot()
    }

    /// Returns `true` if the last write failed and storage is behind memory.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Registers a change listener.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&HistoryEvent) + 'static,
    {
        self.notifier.subscribe(listener)
    }

    /// Removes a change listener.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Looks up a record by id.
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Returns `true` if a record has this id.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Number of records held in memory.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The current selection state.
    pub fn selection(&self) -> &Selection {
        self.selection.state()
    }

    /// The selected record, if any.
    pub fn current(&self) -> Option<&Record> {
        self.selection.current().and_then(|id| self.get(id))
    }

    /// The projector used by [`Self::project`].
    pub fn projector(&self) -> &HistoryProjector {
        &self.projector
    }

    /// The backing store.
    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }

    /// Projects the current state with the configured projector.
    pub fn project(&self) -> Vec<ProjectedItem> {
        self.projector.project(&self.records, self.selection.state())
    }

    /// Projects the current state restricted by `filter`.
    pub fn project_filtered(&self, filter: &HistoryFilter) -> Vec<ProjectedItem> {
        self.projector
            .project_filtered(&self.records, self.selection.state(), filter)
    }

    fn write_snapshot(&mut self) -> Result<(), HistoryError> {
        match self.store.persist(&self.records) {
            Ok(()) => {
                self.unsaved = false;
                Ok(())
            }
            Err(e) => {
                self.unsaved = true;
                log::warn!("History write failed, keeping changes in memory: {}", e);
                Err(e)
            }
        }
    }
}
