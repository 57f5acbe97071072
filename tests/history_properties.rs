//! Property tests for history invariants.
//!
//! Random operation sequences are applied to a coordinator backed by memory
//! storage; after every step the selection must point at an existing record
//! and the stored snapshot must match memory.

use chat_history::history::storage::{decode_records, encode_records};
use chat_history::{
    HistoryProjector, MemoryStorage, MutationCoordinator, Record, RecordStore, Selection, Source,
};
use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashSet;

#[derive(Debug, Clone)]
enum Op {
    Record(String),
    View(usize),
    Delete(usize),
    DeleteMissing,
    Clear,
    NewChat,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => "[a-z ]{1,20}".prop_map(Op::Record),
        2 => any::<usize>().prop_map(Op::View),
        2 => any::<usize>().prop_map(Op::Delete),
        1 => Just(Op::DeleteMissing),
        1 => Just(Op::Clear),
        1 => Just(Op::NewChat),
    ]
}

/// Every record lands in the same millisecond.
fn frozen_clock() -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
}

fn open(storage: MemoryStorage) -> MutationCoordinator<MemoryStorage> {
    MutationCoordinator::open(RecordStore::new(storage), HistoryProjector::default())
}

fn id_at(history: &MutationCoordinator<MemoryStorage>, index: usize) -> Option<String> {
    if history.is_empty() {
        return None;
    }
    Some(history.records()[index % history.len()].id.clone())
}

fn apply(history: &mut MutationCoordinator<MemoryStorage>, op: &Op) {
    match op {
        Op::Record(prompt) => {
            if prompt.trim().is_empty() {
                assert!(history.record_completed_exchange(prompt.as_str(), "", Vec::new()).is_err());
            } else {
                history
                    .record_completed_exchange(prompt.as_str(), "answer", Vec::new())
                    .unwrap();
            }
        }
        Op::View(index) => {
            if let Some(id) = id_at(history, *index) {
                history.view(&id).unwrap();
            }
        }
        Op::Delete(index) => {
            if let Some(id) = id_at(history, *index) {
                assert!(history.delete_entry(&id).unwrap());
            }
        }
        Op::DeleteMissing => {
            assert!(!history.delete_entry("no-such-id").unwrap());
        }
        Op::Clear => history.clear_all().unwrap(),
        Op::NewChat => history.new_chat(),
    }
}

fn record_strategy() -> impl Strategy<Value = Vec<Record>> {
    let source = ("[a-z]{1,10}", "[A-Za-z ]{0,12}")
        .prop_map(|(host, title)| Source::new(format!("https://{}.example", host), title));

    prop::collection::vec(
        (
            "[a-z]{1,12}",
            "[a-z ]{0,30}",
            0i64..2_000_000_000,
            0u32..1_000_000_000,
            prop::collection::vec(source, 0..3),
        ),
        0..20,
    )
    .prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, (prompt, response, secs, nanos, sources))| {
                let created_at = Utc.timestamp_opt(secs, nanos).unwrap();
                Record::new(format!("{}-{}", secs, i), prompt, response, sources, created_at)
                    .unwrap()
            })
            .collect()
    })
}

proptest! {
    /// The selection never names a missing record, and storage mirrors memory.
    #[test]
    fn prop_no_dangling_selection(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let storage = MemoryStorage::new();
        let mut history = open(storage.clone()).with_clock(frozen_clock);

        for op in &ops {
            apply(&mut history, op);

            if let Some(id) = history.selection().id() {
                prop_assert!(history.contains(id), "dangling selection {} after {:?}", id, op);
            }
            let active = history.project().iter().filter(|item| item.is_active).count();
            prop_assert!(active <= 1);

            let stored = RecordStore::new(storage.clone()).load();
            prop_assert_eq!(stored.as_slice(), history.records());
        }
    }

    /// N successful records yield N entries with distinct ids.
    #[test]
    fn prop_record_count_and_unique_ids(prompts in prop::collection::vec("[a-z]{1,8}", 1..30)) {
        let mut history = open(MemoryStorage::new()).with_clock(frozen_clock);

        for prompt in &prompts {
            history.record_completed_exchange(prompt.as_str(), "", Vec::new()).unwrap();
        }

        prop_assert_eq!(history.len(), prompts.len());
        let ids: HashSet<&str> = history.records().iter().map(|r| r.id.as_str()).collect();
        prop_assert_eq!(ids.len(), prompts.len());
    }

    /// Deleting twice leaves the same state as deleting once.
    #[test]
    fn prop_delete_is_idempotent(count in 1usize..10, target in any::<usize>()) {
        let mut history = open(MemoryStorage::new());
        for i in 0..count {
            history.record_completed_exchange(format!("q{}", i), "", Vec::new()).unwrap();
        }
        let id = history.records()[target % count].id.clone();
        history.view(&id).unwrap();

        prop_assert!(history.delete_entry(&id).unwrap());
        let after_first: Vec<Record> = history.records().to_vec();
        prop_assert!(!history.delete_entry(&id).unwrap());

        prop_assert_eq!(history.records(), after_first.as_slice());
        prop_assert_eq!(history.selection(), &Selection::Idle);
    }

    /// Clearing always ends empty and idle.
    #[test]
    fn prop_clear_all_resets(count in 0usize..10, viewed in any::<usize>()) {
        let mut history = open(MemoryStorage::new());
        for i in 0..count {
            history.record_completed_exchange(format!("q{}", i), "", Vec::new()).unwrap();
        }
        if let Some(id) = id_at(&history, viewed) {
            history.view(&id).unwrap();
        }

        history.clear_all().unwrap();
        prop_assert!(history.is_empty());
        prop_assert_eq!(history.selection(), &Selection::Idle);
    }

    /// Projection depends only on records and selection, not on input order.
    #[test]
    fn prop_projection_is_deterministic(records in record_strategy(), seed in any::<u64>()) {
        let projector = HistoryProjector::default();
        let selection = records
            .first()
            .map(|r| Selection::Viewing(r.id.clone()))
            .unwrap_or_default();

        let mut shuffled = records.clone();
        if !shuffled.is_empty() {
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
        }

        let items = projector.project(&records, &selection);
        prop_assert_eq!(&items, &projector.project(&shuffled, &selection));
        prop_assert_eq!(items.len(), records.len());

        for pair in items.windows(2) {
            let a = records.iter().find(|r| r.id == pair[0].id).unwrap();
            let b = records.iter().find(|r| r.id == pair[1].id).unwrap();
            prop_assert!(a.created_at >= b.created_at);
        }
    }

    /// Persisting then loading a snapshot gives back the same records.
    #[test]
    fn prop_snapshot_round_trip(records in record_strategy()) {
        let store = RecordStore::new(MemoryStorage::new());
        store.persist(&records).unwrap();
        prop_assert_eq!(store.load(), records.clone());

        let blob = encode_records(&records).unwrap();
        prop_assert_eq!(decode_records(&blob).unwrap(), records);
    }
}
