//! A chat session: generation, submission guard and history wired together.
//!
//! [`ChatSession`] is what an application drives. A submission goes through
//! three steps:
//!
//! 1. `begin_submission` registers the prompt and locks further submissions
//! 2. the application (or [`ChatSession::submit`]) obtains the answer
//! 3. `complete_submission` records it, unless the request was abandoned
//!
//! Failed generations and abandoned requests never create a record.

use crate::config::ChatHistoryConfig;
use crate::generation::{
    GeneratedResponse, GenerationBackend, GenerationError, GenerationRequest, PendingRequests,
    SubmissionError,
};
use crate::history::{HistoryError, KeyValueStorage, MutationCoordinator, Record};
use std::fmt;

/// Errors surfaced by [`ChatSession`].
#[derive(Debug)]
pub enum SessionError {
    /// The submission was refused or its response arrived too late.
    Submission(SubmissionError),

    /// The generation service failed; nothing was recorded.
    Generation(GenerationError),

    /// The history rejected or could not save the exchange.
    History(HistoryError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Submission(err) => write!(f, "{}", err),
            SessionError::Generation(err) => write!(f, "{}", err),
            SessionError::History(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Submission(err) => Some(err),
            SessionError::Generation(err) => Some(err),
            SessionError::History(err) => Some(err),
        }
    }
}

impl From<SubmissionError> for SessionError {
    fn from(err: SubmissionError) -> Self {
        SessionError::Submission(err)
    }
}

impl From<GenerationError> for SessionError {
    fn from(err: GenerationError) -> Self {
        SessionError::Generation(err)
    }
}

impl From<HistoryError> for SessionError {
    fn from(err: HistoryError) -> Self {
        SessionError::History(err)
    }
}

/// A running chat with history.
pub struct ChatSession<S, B> {
    history: MutationCoordinator<S>,
    backend: B,
    pending: PendingRequests,
    model: String,
    use_search: bool,
}

impl<S: KeyValueStorage, B: GenerationBackend> ChatSession<S, B> {
    /// Creates a session from an opened history and a backend.
    pub fn new(history: MutationCoordinator<S>, backend: B, config: &ChatHistoryConfig) -> Self {
        let pending = if config.allow_concurrent_requests {
            PendingRequests::allowing_concurrent()
        } else {
            PendingRequests::new()
        };

        Self {
            history,
            backend,
            pending,
            model: config.default_model.clone(),
            use_search: config.use_search_grounding,
        }
    }

    /// Opens the history stored in `storage` and creates a session.
    pub fn open(storage: S, backend: B, config: &ChatHistoryConfig) -> Self {
        Self::new(MutationCoordinator::from_config(storage, config), backend, config)
    }

    /// Sends `prompt` and records the answer.
    ///
    /// # Errors
    ///
    /// - `SessionError::Submission(Busy)` while another request is pending
    /// - `SessionError::Generation` if the request is invalid or the service fails
    /// - `SessionError::History` if the record could not be saved; it is still
    ///   kept in memory and `HistoryError::unsaved_record` returns it
    pub fn submit(&mut self, prompt: &str) -> Result<Record, SessionError> {
        let request_id = self.begin_submission(prompt)?;
        let request = self
            .pending
            .get(&request_id)
            .cloned()
            .ok_or_else(|| SubmissionError::Abandoned(request_id.clone()))?;

        let outcome = self.backend.generate(&request);
        self.complete_submission(&request_id, outcome)
    }

    /// Registers a submission and returns its request id.
    ///
    /// Use this with [`Self::complete_submission`] when the application runs
    /// the generation call itself (for example on an async runtime).
    pub fn begin_submission(&mut self, prompt: &str) -> Result<String, SessionError> {
        let request = GenerationRequest {
            prompt: prompt.trim().to_string(),
            model: self.model.clone(),
            use_search: self.use_search,
        };
        request.validate()?;

        let request_id = self.pending.begin(request)?;
        log::debug!("Started generation request {}", request_id);
        Ok(request_id)
    }

    /// Finishes a submission with the outcome of its generation call.
    ///
    /// A successful answer is recorded only if the request is still active.
    /// A failed one just releases the submission lock.
    pub fn complete_submission(
        &mut self,
        request_id: &str,
        outcome: Result<GeneratedResponse, GenerationError>,
    ) -> Result<Record, SessionError> {
        let request = match self.pending.complete(request_id) {
            Ok(request) => request,
            Err(e) => {
                log::debug!("Dropping response for abandoned request {}", request_id);
                return Err(e.into());
            }
        };

        let response = outcome.map_err(|e| {
            log::warn!("Generation request {} failed: {}", request_id, e);
            e
        })?;

        let record = self.history.record_completed_exchange(
            request.prompt,
            response.text.clone(),
            response.normalized_sources(),
        )?;
        Ok(record)
    }

    /// Cancels a pending submission; its response will be dropped.
    pub fn cancel_submission(&mut self, request_id: &str) -> Result<(), SessionError> {
        self.pending.cancel(request_id)?;
        Ok(())
    }

    /// Starts a new chat: abandons pending requests and deselects history.
    pub fn new_chat(&mut self) {
        self.pending.cancel_all();
        self.history.new_chat();
    }

    /// Returns `true` while the submit action should stay disabled.
    pub fn is_busy(&self) -> bool {
        self.pending.is_busy()
    }

    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Changes the model for subsequent submissions.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn use_search(&self) -> bool {
        self.use_search
    }

    pub fn set_use_search(&mut self, use_search: bool) {
        self.use_search = use_search;
    }

    /// The history, for viewing and projecting.
    pub fn history(&self) -> &MutationCoordinator<S> {
        &self.history
    }

    /// The history, for view, delete and clear operations.
    pub fn history_mut(&mut self) -> &mut MutationCoordinator<S> {
        &mut self.history
    }
}
