//! Tracking of in-flight generation requests.
//!
//! Every submission gets a ticket from [`PendingRequests`]. A ticket that is
//! cancelled (the user started a new chat, or navigated away) is forgotten, so
//! a response that arrives for it later is reported as abandoned and never
//! reaches the history.
//!
//! Unless concurrent requests are allowed, only one ticket may be active at a
//! time; a second submission is refused with [`SubmissionError::Busy`].

use super::GenerationRequest;
use std::collections::HashMap;
use std::fmt;

/// Errors for submission bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// Another request is still in flight.
    Busy(String),

    /// The request was cancelled before its response arrived.
    Abandoned(String),

    /// No active request has this id.
    NotFound(String),
}

impl fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionError::Busy(id) => {
                write!(f, "Another request is still in progress: {}", id)
            }
            SubmissionError::Abandoned(id) => {
                write!(f, "Request was cancelled before it completed: {}", id)
            }
            SubmissionError::NotFound(id) => write!(f, "Request not found: {}", id),
        }
    }
}

impl std::error::Error for SubmissionError {}

/// Registry of active generation requests.
#[derive(Debug, Default)]
pub struct PendingRequests {
    active_requests: HashMap<String, GenerationRequest>,

    /// Request ids by start time (oldest first).
    request_order: Vec<String>,

    next_seq: u64,
    allow_concurrent: bool,
}

impl PendingRequests {
    /// Creates a tracker that allows one request at a time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracker that accepts overlapping requests.
    pub fn allowing_concurrent() -> Self {
        Self {
            allow_concurrent: true,
            ..Self::default()
        }
    }

    /// Registers a submission and returns its request id.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::Busy` with the active id when another request
    /// is in flight and concurrent requests are not allowed.
    pub fn begin(&mut self, request: GenerationRequest) -> Result<String, SubmissionError> {
        if !self.allow_concurrent {
            if let Some(active) = self.request_order.first() {
                return Err(SubmissionError::Busy(active.clone()));
            }
        }

        self.next_seq += 1;
        let request_id = format!("req-{}", self.next_seq);
        self.request_order.push(request_id.clone());
        self.active_requests.insert(request_id.clone(), request);
        Ok(request_id)
    }

    /// Retires a request whose response arrived, returning what was asked.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::Abandoned` if the request was cancelled or
    /// never registered. The caller must drop the response.
    pub fn complete(&mut self, request_id: &str) -> Result<GenerationRequest, SubmissionError> {
        self.take(request_id)
            .ok_or_else(|| SubmissionError::Abandoned(request_id.to_string()))
    }

    /// Cancels a request.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::NotFound` if it is not active.
    pub fn cancel(&mut self, request_id: &str) -> Result<GenerationRequest, SubmissionError> {
        let request = self
            .take(request_id)
            .ok_or_else(|| SubmissionError::NotFound(request_id.to_string()))?;
        log::debug!("Cancelled generation request {}", request_id);
        Ok(request)
    }

    /// Cancels the most recently started request and returns its id.
    pub fn cancel_most_recent(&mut self) -> Result<String, SubmissionError> {
        let request_id = self
            .request_order
            .last()
            .cloned()
            .ok_or_else(|| SubmissionError::NotFound("no active requests".to_string()))?;
        self.cancel(&request_id)?;
        Ok(request_id)
    }

    /// Cancels every active request and returns how many there were.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.active_requests.len();
        if count > 0 {
            log::debug!("Cancelled {} pending generation request(s)", count);
        }
        self.active_requests.clear();
        self.request_order.clear();
        count
    }

    pub fn active_count(&self) -> usize {
        self.active_requests.len()
    }

    /// Active request ids, oldest first.
    pub fn active_request_ids(&self) -> Vec<String> {
        self.request_order.clone()
    }

    /// The request registered under `request_id`, if still active.
    pub fn get(&self, request_id: &str) -> Option<&GenerationRequest> {
        self.active_requests.get(request_id)
    }

    pub fn is_active(&self, request_id: &str) -> bool {
        self.active_requests.contains_key(request_id)
    }

    /// Returns `true` if a new submission would be refused.
    pub fn is_busy(&self) -> bool {
        !self.allow_concurrent && !self.request_order.is_empty()
    }

    fn take(&mut self, request_id: &str) -> Option<GenerationRequest> {
        let request = self.active_requests.remove(request_id)?;
        self.request_order.retain(|id| id != request_id);
        Some(request)
    }
}
