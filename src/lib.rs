//! Local conversation history for a generative chat client.
//!
//! Every completed prompt/response exchange is recorded, persisted to a local
//! key-value store and offered back as an ordered, labelled list. Exactly one
//! past exchange can be "viewed" at a time, and deleting or clearing history
//! never leaves that selection pointing at a record that is gone.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - **history**: records, storage backends, selection, projection and the
//!   [`MutationCoordinator`] that ties them together
//! - **generation**: the [`GenerationBackend`] seam and in-flight request tracking
//! - **session**: [`ChatSession`], which records answers from a backend
//! - **config**: settings loading, validation and the global configuration
//!
//! # Flow
//!
//! 1. A prompt is submitted; further submissions are refused until it finishes
//! 2. The backend returns a complete answer (or an error, which records nothing)
//! 3. The exchange gets a unique id and is appended to history
//! 4. The whole history is written back to storage as one snapshot
//! 5. Listeners are told, and re-project the list for display
//!
//! # Usage
//!
//! ```
//! use chat_history::{ChatHistoryConfig, ChatSession, GeneratedResponse, GenerationError,
//!     GenerationRequest, MemoryStorage};
//!
//! fn backend(request: &GenerationRequest) -> Result<GeneratedResponse, GenerationError> {
//!     Ok(GeneratedResponse::new(format!("You asked: {}", request.prompt)))
//! }
//!
//! let config = ChatHistoryConfig::default();
//! let mut session = ChatSession::open(MemoryStorage::new(), backend, &config);
//!
//! let record = session.submit("What is a borrow checker?").unwrap();
//! session.history_mut().view(&record.id).unwrap();
//!
//! let items = session.history().project();
//! assert_eq!(items[0].display_label, "What is a borrow checker?");
//! assert!(items[0].is_active);
//! ```

pub mod config;
pub mod generation;
pub mod history;
pub mod session;

pub use config::ChatHistoryConfig;
pub use generation::{
    GeneratedResponse, GenerationBackend, GenerationError, GenerationRequest, PendingRequests,
    SubmissionError,
};
pub use history::{
    FileStorage, HistoryError, HistoryEvent, HistoryFilter, HistoryProjector, KeyValueStorage,
    MemoryStorage, MutationCoordinator, ProjectedItem, Record, RecordStore, Selection, Source,
    StorageError,
};
pub use session::{ChatSession, SessionError};
