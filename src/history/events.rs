//! Change notifications for the presentation layer.
//!
//! The coordinator announces every completed mutation through a
//! [`ChangeNotifier`]. Subscribers typically re-run the projector and
//! re-render; they receive the event after the state change is complete.

use std::fmt;

/// A completed change to the history or the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    /// A new record was added.
    Recorded { id: String },

    /// A record was removed. `selection_cleared` is set when it was the
    /// selected entry.
    Deleted { id: String, selection_cleared: bool },

    /// Every record was removed and the selection reset.
    Cleared { removed: usize },

    /// A record became the selected entry.
    Viewed { id: String },

    /// The selection moved to idle without a store change (a new chat).
    SelectionCleared,
}

/// Handle returned by [`ChangeNotifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&HistoryEvent)>;

/// Registry of change listeners, called in subscription order.
#[derive(Default)]
pub struct ChangeNotifier {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener and returns its handle.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&HistoryEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener.
    ///
    /// Returns `true` if the listener was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Delivers `event` to every listener.
    pub fn notify(&mut self, event: &HistoryEvent) {
        log::debug!("History event: {:?}", event);
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("next_id", &self.next_id)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
