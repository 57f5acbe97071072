//! Chat session workflows: submit, reload, cancel.

use super::{echo_backend, temp_file_storage};
use chat_history::config::{load_config, reset_config};
use chat_history::{
    ChatHistoryConfig, ChatSession, GeneratedResponse, GenerationError, GenerationRequest,
    SessionError, Source, SubmissionError,
};
use serde_json::json;
use serial_test::serial;

#[test]
fn test_submitted_exchanges_survive_restart() {
    let (_temp_dir, storage) = temp_file_storage();
    let config = ChatHistoryConfig::default();

    let mut session = ChatSession::open(storage.clone(), echo_backend, &config);
    session.submit("first question").unwrap();
    session.submit("second question").unwrap();
    drop(session);

    let restarted = ChatSession::open(storage, echo_backend, &config);
    let items = restarted.history().project();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].display_label, "second question");
    assert_eq!(items[1].display_label, "first question");
    assert!(items.iter().all(|item| !item.is_active));
}

#[test]
#[serial]
fn test_session_uses_loaded_settings() {
    let (temp_dir, storage) = temp_file_storage();
    let settings = json!({
        "chat-history": {
            "storageKey": "my-chats",
            "labelMaxChars": 10,
            "labelEllipsis": "…"
        }
    });
    let config = load_config(Some(settings)).unwrap();

    let mut session = ChatSession::open(storage, echo_backend, &config);
    session
        .submit("A prompt that is much longer than ten characters")
        .unwrap();

    let items = session.history().project();
    assert_eq!(items[0].display_label, "A prompt t…");
    assert!(temp_dir.path().join("my-chats.json").exists());
    reset_config();
}

#[test]
fn test_failed_generation_leaves_history_untouched() {
    let (_temp_dir, storage) = temp_file_storage();
    let failing = |_: &GenerationRequest| -> Result<GeneratedResponse, GenerationError> {
        Err(GenerationError::NetworkError("connection reset".to_string()))
    };

    let mut session = ChatSession::open(storage.clone(), failing, &ChatHistoryConfig::default());
    let err = session.submit("hi").unwrap_err();
    assert!(matches!(err, SessionError::Generation(GenerationError::NetworkError(_))));
    assert_eq!(format!("{}", err), "Network error: connection reset");

    assert!(!session.is_busy());
    let reopened = ChatSession::open(storage, echo_backend, &ChatHistoryConfig::default());
    assert!(reopened.history().is_empty());
}

#[test]
fn test_late_response_after_new_chat_is_dropped() {
    let (_temp_dir, storage) = temp_file_storage();
    let mut session = ChatSession::open(storage, echo_backend, &ChatHistoryConfig::default());

    let request_id = session.begin_submission("slow question").unwrap();
    assert!(session.is_busy());
    session.new_chat();

    let result =
        session.complete_submission(&request_id, Ok(GeneratedResponse::new("too late")));
    assert!(matches!(
        result,
        Err(SessionError::Submission(SubmissionError::Abandoned(_)))
    ));
    assert!(session.history().is_empty());

    // The lock is released, so a new submission goes through.
    assert!(session.submit("next question").is_ok());
}

#[test]
fn test_cited_answer_is_recorded_with_sources() {
    let (_temp_dir, storage) = temp_file_storage();
    let grounded = |request: &GenerationRequest| -> Result<GeneratedResponse, GenerationError> {
        assert!(request.use_search);
        Ok(GeneratedResponse::new("Rust 1.0 shipped in 2015.").with_sources(vec![
            Source::new("https://blog.rust-lang.org/", "Rust Blog"),
            Source::new("https://blog.rust-lang.org/", "Rust Blog"),
        ]))
    };
    let config = ChatHistoryConfig {
        use_search_grounding: true,
        ..Default::default()
    };

    let mut session = ChatSession::open(storage.clone(), grounded, &config);
    let record = session.submit("When did Rust 1.0 ship?").unwrap();
    assert_eq!(record.sources.len(), 1);

    let reopened = ChatSession::open(storage, echo_backend, &config);
    assert_eq!(reopened.history().records()[0].sources, record.sources);
}
