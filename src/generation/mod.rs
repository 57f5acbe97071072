//! Interface to the external generation service.
//!
//! The history core does not talk to the network. It consumes a
//! [`GenerationBackend`] that turns a [`GenerationRequest`] into a complete
//! [`GeneratedResponse`] or a [`GenerationError`]. Whether the backend streams
//! internally does not matter; only the final text and citations are used.

pub mod error;
pub mod pending;

pub use error::GenerationError;
pub use pending::{PendingRequests, SubmissionError};

use crate::config::ChatHistoryConfig;
use crate::history::Source;
use std::collections::HashSet;

/// A prompt to send to the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,

    /// Model selector understood by the backend.
    pub model: String,

    /// Whether the answer should be grounded with web search (and cited).
    pub use_search: bool,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            use_search: false,
        }
    }

    /// Builds a request using the model and grounding settings in `config`.
    pub fn from_config(prompt: impl Into<String>, config: &ChatHistoryConfig) -> Self {
        Self {
            prompt: prompt.into(),
            model: config.default_model.clone(),
            use_search: config.use_search_grounding,
        }
    }

    pub fn with_search(mut self, use_search: bool) -> Self {
        self.use_search = use_search;
        self
    }

    /// Checks the request before it is sent.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.prompt.trim().is_empty() {
            return Err(GenerationError::InvalidRequest(
                "prompt must not be empty".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(GenerationError::InvalidRequest(
                "model must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// The complete answer to a [`GenerationRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedResponse {
    pub text: String,

    /// Citations in the order the service returned them.
    pub sources: Vec<Source>,
}

impl GeneratedResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }

    /// Citations with blank URIs dropped and repeated URIs removed.
    ///
    /// Grounding metadata often cites the same page several times; the first
    /// occurrence keeps its position.
    pub fn normalized_sources(&self) -> Vec<Source> {
        let mut seen = HashSet::new();
        self.sources
            .iter()
            .filter(|source| !source.uri.trim().is_empty())
            .filter(|source| seen.insert(source.uri.trim().to_string()))
            .map(|source| Source::new(source.uri.trim(), source.title.trim()))
            .collect()
    }
}

/// A generation service.
///
/// Implementations wrap the actual network client. They must only return
/// `Ok` with a finished answer; partial output is reported as an error.
pub trait GenerationBackend {
    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedResponse, GenerationError>;
}

impl<F> GenerationBackend for F
where
    F: Fn(&GenerationRequest) -> Result<GeneratedResponse, GenerationError>,
{
    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedResponse, GenerationError> {
        self(request)
    }
}
