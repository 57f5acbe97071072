//! History workflows against file-backed storage.
//!
//! These tests reopen the same directory to check what survives a reload.

use super::temp_file_storage;
use chat_history::history::storage::decode_records;
use chat_history::{
    ChatHistoryConfig, HistoryError, HistoryEvent, HistoryFilter, KeyValueStorage,
    MutationCoordinator, RecordStore, Selection,
};
use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

fn open(storage: chat_history::FileStorage) -> MutationCoordinator<chat_history::FileStorage> {
    MutationCoordinator::from_config(storage, &ChatHistoryConfig::default())
}

#[test]
fn test_history_survives_reopen() {
    let (temp_dir, storage) = temp_file_storage();

    let mut history = open(storage.clone());
    let a = history
        .record_completed_exchange("hi", "hello", Vec::new())
        .unwrap();
    let b = history
        .record_completed_exchange("bye", "goodbye", Vec::new())
        .unwrap();
    drop(history);

    let path = temp_dir.path().join("chat-history.json");
    assert!(path.exists(), "snapshot file should be written");
    assert!(!temp_dir.path().join("chat-history.json.tmp").exists());

    let reopened = open(storage);
    assert_eq!(reopened.records(), &[a, b]);
    assert_eq!(reopened.selection(), &Selection::Idle);
}

#[test]
fn test_view_then_delete_scenario() {
    let (_temp_dir, storage) = temp_file_storage();
    let mut history = open(storage.clone());

    let a = history
        .record_completed_exchange("hi", "hello", Vec::new())
        .unwrap();
    let b = history
        .record_completed_exchange("bye", "goodbye", Vec::new())
        .unwrap();

    history.view(&a.id).unwrap();
    assert_eq!(history.selection(), &Selection::Viewing(a.id.clone()));

    assert!(history.delete_entry(&a.id).unwrap());
    assert_eq!(history.selection(), &Selection::Idle);
    assert_eq!(history.records(), &[b.clone()]);

    let reloaded = RecordStore::new(storage).load();
    assert_eq!(reloaded, vec![b]);
}

#[test]
fn test_clear_all_scenario() {
    let (temp_dir, storage) = temp_file_storage();
    let mut history = open(storage.clone());

    let ids: Vec<String> = ["one", "two", "three"]
        .iter()
        .map(|prompt| {
            history
                .record_completed_exchange(*prompt, "answer", Vec::new())
                .unwrap()
                .id
        })
        .collect();
    history.view(&ids[1]).unwrap();

    history.clear_all().unwrap();
    assert!(history.is_empty());
    assert_eq!(history.selection(), &Selection::Idle);

    let blob = fs::read_to_string(temp_dir.path().join("chat-history.json")).unwrap();
    assert!(decode_records(&blob).unwrap().is_empty());
    assert!(open(storage).is_empty());
}

#[test]
fn test_corrupt_snapshot_loads_as_empty() {
    let (temp_dir, storage) = temp_file_storage();
    fs::write(temp_dir.path().join("chat-history.json"), "{not json").unwrap();

    let mut history = open(storage.clone());
    assert!(history.is_empty());

    // The next write replaces the corrupt snapshot.
    history
        .record_completed_exchange("fresh start", "ok", Vec::new())
        .unwrap();
    let blob = storage.get("chat-history").unwrap().unwrap();
    assert_eq!(decode_records(&blob).unwrap().len(), 1);
}

#[test]
fn test_partially_corrupt_snapshot_keeps_valid_entries() {
    let (temp_dir, storage) = temp_file_storage();
    let blob = r#"[
        {"id": "1700000000000", "prompt": "kept", "response": "yes", "timestamp": 1700000000000},
        {"id": "1700000000001", "response": "no prompt", "timestamp": 1700000000001},
        "not an object",
        {"id": "1700000000000", "prompt": "duplicate", "response": "", "timestamp": 1700000000000}
    ]"#;
    fs::write(temp_dir.path().join("chat-history.json"), blob).unwrap();

    let history = open(storage);
    assert_eq!(history.len(), 1);
    assert_eq!(history.records()[0].prompt, "kept");
}

#[test]
fn test_ids_stay_unique_across_sessions() {
    let (_temp_dir, storage) = temp_file_storage();

    let mut first = open(storage.clone());
    let earlier: Vec<String> = (0..5)
        .map(|i| {
            first
                .record_completed_exchange(format!("q{}", i), "a", Vec::new())
                .unwrap()
                .id
        })
        .collect();
    drop(first);

    let mut second = open(storage);
    let later = second
        .record_completed_exchange("after reload", "a", Vec::new())
        .unwrap();
    assert!(!earlier.contains(&later.id));
    assert_eq!(second.len(), 6);
}

#[test]
fn test_projection_reflects_selection_and_order() {
    let (_temp_dir, storage) = temp_file_storage();
    let mut history = open(storage);

    let first = history
        .record_completed_exchange("an older question", "a", Vec::new())
        .unwrap();
    let second = history
        .record_completed_exchange("a newer question", "b", Vec::new())
        .unwrap();
    history.view(&first.id).unwrap();

    let items = history.project();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, second.id);
    assert!(!items[0].is_active);
    assert_eq!(items[1].id, first.id);
    assert!(items[1].is_active);

    let filtered = history.project_filtered(&HistoryFilter::new().with_query("older"));
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, first.id);
}

#[test]
fn test_listeners_follow_a_session() {
    let (_temp_dir, storage) = temp_file_storage();
    let mut history = open(storage);

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    history.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    let record = history
        .record_completed_exchange("hi", "hello", Vec::new())
        .unwrap();
    history.view(&record.id).unwrap();
    history.delete_entry(&record.id).unwrap();

    let events = events.borrow();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], HistoryEvent::Recorded { .. }));
    assert!(matches!(events[1], HistoryEvent::Viewed { .. }));
    assert!(matches!(
        events[2],
        HistoryEvent::Deleted {
            selection_cleared: true,
            ..
        }
    ));
}

#[test]
fn test_view_of_deleted_entry_is_not_found() {
    let (_temp_dir, storage) = temp_file_storage();
    let mut history = open(storage);

    let record = history
        .record_completed_exchange("hi", "hello", Vec::new())
        .unwrap();
    history.delete_entry(&record.id).unwrap();

    assert!(matches!(
        history.view(&record.id),
        Err(HistoryError::NotFound(_))
    ));
    assert_eq!(history.selection(), &Selection::Idle);
}
