//! Tracking of the currently viewed history entry.
//!
//! The tracker is a two-state machine, `Idle` (the "new chat" view) and
//! `Viewing(id)`. It performs no validation of its own; the coordinator only
//! selects ids that exist and clears the selection when the entry goes away.

/// The currently viewed entry, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Selection {
    /// No entry is selected.
    #[default]
    Idle,
    /// The entry with this id is displayed.
    Viewing(String),
}

impl Selection {
    /// The selected id, or `None` when idle.
    pub fn id(&self) -> Option<&str> {
        match self {
            Selection::Idle => None,
            Selection::Viewing(id) => Some(id),
        }
    }

    /// Returns `true` if `id` is the selected entry.
    pub fn is_viewing(&self, id: &str) -> bool {
        self.id() == Some(id)
    }

    /// Returns `true` in the "new chat" state.
    pub fn is_idle(&self) -> bool {
        matches!(self, Selection::Idle)
    }
}

/// Owns the [`Selection`] state.
#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    state: Selection,
}

impl SelectionTracker {
    /// Creates a tracker in the `Idle` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves to `Viewing(id)` from any state.
    pub fn select(&mut self, id: impl Into<String>) {
        self.state = Selection::Viewing(id.into());
    }

    /// Moves to `Idle`, returning the previously selected id.
    pub fn clear(&mut self) -> Option<String> {
        match std::mem::take(&mut self.state) {
            Selection::Idle => None,
            Selection::Viewing(id) => Some(id),
        }
    }

    /// Moves to `Idle` only if `id` is the selected entry.
    ///
    /// Returns `true` if the selection was cleared.
    pub fn clear_if(&mut self, id: &str) -> bool {
        if self.state.is_viewing(id) {
            self.state = Selection::Idle;
            true
        } else {
            false
        }
    }

    /// The selected id, or `None` when idle.
    pub fn current(&self) -> Option<&str> {
        self.state.id()
    }

    /// The full selection state.
    pub fn state(&self) -> &Selection {
        &self.state
    }
}
