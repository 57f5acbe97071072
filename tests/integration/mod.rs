//! Shared setup for the history integration tests.

pub mod history_workflow_test;
pub mod session_test;

use chat_history::{FileStorage, GeneratedResponse, GenerationError, GenerationRequest};
use std::sync::Once;
use tempfile::TempDir;

static INIT: Once = Once::new();

/// Initialize test environment (run once)
pub fn init_test_env() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// File storage in a fresh temporary directory.
///
/// Keep the `TempDir` alive for as long as the storage is used.
pub fn temp_file_storage() -> (TempDir, FileStorage) {
    init_test_env();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage = FileStorage::new(temp_dir.path());
    (temp_dir, storage)
}

/// Backend that answers every prompt by echoing it.
pub fn echo_backend(request: &GenerationRequest) -> Result<GeneratedResponse, GenerationError> {
    Ok(GeneratedResponse::new(format!("echo: {}", request.prompt)))
}
