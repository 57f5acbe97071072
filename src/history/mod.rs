//! Conversation history tracking and persistence.
//!
//! This module owns the list of finished prompt/response exchanges and the
//! "currently viewed" pointer, and keeps the two consistent.
//!
//! # Components
//!
//! - [`storage`]: key-value backends and the snapshot [`RecordStore`]
//! - [`selection`]: the `Idle` / `Viewing(id)` state machine
//! - [`projector`]: pure, ordered, filtered display view
//! - [`coordinator`]: the only writer of records and selection
//! - [`events`]: change notifications for the presentation layer
//! - [`format`]: plain-text rendering helpers
//!
//! # Example
//!
//! ```
//! use chat_history::history::{HistoryProjector, MemoryStorage, MutationCoordinator, RecordStore};
//!
//! let store = RecordStore::new(MemoryStorage::new());
//! let mut history = MutationCoordinator::open(store, HistoryProjector::default());
//!
//! let record = history.record_completed_exchange("hi", "hello", Vec::new()).unwrap();
//! history.view(&record.id).unwrap();
//!
//! let items = history.project();
//! assert!(items[0].is_active);
//! ```

pub mod coordinator;
pub mod events;
pub mod format;
pub mod ids;
pub mod models;
pub mod projector;
pub mod selection;
pub mod storage;

// Re-export commonly used types
pub use coordinator::MutationCoordinator;
pub use events::{ChangeNotifier, HistoryEvent, SubscriptionId};
pub use format::{
    format_history_list, format_history_stats, format_record_details, format_relative_time,
    format_sources,
};
pub use ids::{compare_ids, IdGenerator};
pub use models::{HistoryError, Record, Source};
pub use projector::{sort_newest_first, truncate_label, HistoryFilter, HistoryProjector, ProjectedItem};
pub use selection::{Selection, SelectionTracker};
pub use storage::{
    FileStorage, KeyValueStorage, MemoryStorage, RecordStore, StorageError, DEFAULT_STORAGE_KEY,
};
