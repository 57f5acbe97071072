//! Generation service error types.
//!
//! Errors a [`GenerationBackend`](super::GenerationBackend) reports when a
//! round trip does not produce a complete answer. None of them ever reach the
//! history: a failed exchange is not recorded.

use std::fmt;

/// Errors that can occur while requesting a generated response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The service could not be reached.
    ///
    /// Connection failures, DNS errors and dropped streams.
    NetworkError(String),

    /// The service did not answer in time.
    Timeout,

    /// The service answered with an error status.
    ServiceError {
        /// HTTP-style status code reported by the service.
        status: u16,
        /// Message from the service, if any.
        message: String,
    },

    /// The service blocked the prompt or the answer (safety filters, quota).
    Blocked(String),

    /// The service answered without any text.
    EmptyResponse,

    /// The request was rejected before sending.
    InvalidRequest(String),
}

impl GenerationError {
    /// Returns `true` for failures worth retrying unchanged.
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationError::NetworkError(_) | GenerationError::Timeout => true,
            GenerationError::ServiceError { status, .. } => *status == 429 || *status >= 500,
            GenerationError::Blocked(_)
            | GenerationError::EmptyResponse
            | GenerationError::InvalidRequest(_) => false,
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            GenerationError::Timeout => write!(f, "Generation request timed out"),
            GenerationError::ServiceError { status, message } => {
                if message.is_empty() {
                    write!(f, "Generation service error ({})", status)
                } else {
                    write!(f, "Generation service error ({}): {}", status, message)
                }
            }
            GenerationError::Blocked(reason) => write!(f, "Response blocked: {}", reason),
            GenerationError::EmptyResponse => write!(f, "Generation service returned no text"),
            GenerationError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
        }
    }
}

impl std::error::Error for GenerationError {}
