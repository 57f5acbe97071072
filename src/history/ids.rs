//! Identifier generation for history records.
//!
//! Ids are derived from the creation time in milliseconds. Two records created
//! within the same millisecond get a sequence suffix (`"<millis>-<seq>"`), and
//! a clock that steps backwards never produces a timestamp earlier than one
//! already issued, so `created_at` stays non-decreasing in insertion order.

use super::models::Record;
use chrono::{DateTime, TimeZone, Utc};
use std::cmp::Ordering;

/// An id together with the timestamp it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedId {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Issues unique, monotonically ordered record ids.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last_millis: Option<i64>,
    seq: u32,
}

impl IdGenerator {
    /// Creates a generator with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator that continues after the newest of `records`.
    ///
    /// Both the stored timestamps and any timestamp-derived ids are taken into
    /// account, so ids issued after a restart sort after the loaded ones.
    pub fn seeded_from(records: &[Record]) -> Self {
        let mut newest: Option<(i64, u32)> = None;

        for record in records {
            let candidates = [
                Some((record.created_at_millis(), 0)),
                parse_id(&record.id),
            ];
            for candidate in candidates.into_iter().flatten() {
                if newest.map_or(true, |current| candidate > current) {
                    newest = Some(candidate);
                }
            }
        }

        match newest {
            Some((millis, seq)) => Self {
                last_millis: Some(millis),
                seq,
            },
            None => Self::new(),
        }
    }

    /// Issues the next id for a record created at `now`.
    pub fn next(&mut self, now: DateTime<Utc>) -> IssuedId {
        let now_millis = now.timestamp_millis();

        match self.last_millis {
            Some(last) if now_millis <= last => {
                self.seq = self.seq.saturating_add(1);
                IssuedId {
                    id: format!("{}-{}", last, self.seq),
                    created_at: millis_to_datetime(last).unwrap_or(now),
                }
            }
            _ => {
                self.last_millis = Some(now_millis);
                self.seq = 0;
                IssuedId {
                    id: now_millis.to_string(),
                    created_at: millis_to_datetime(now_millis).unwrap_or(now),
                }
            }
        }
    }
}

/// Parses a timestamp-derived id into `(millis, seq)`.
///
/// Returns `None` for ids that do not follow the `"<millis>"` or
/// `"<millis>-<seq>"` shape (for example ids written by other tools).
pub fn parse_id(id: &str) -> Option<(i64, u32)> {
    let (millis, seq) = match id.split_once('-') {
        Some((millis, seq)) => (millis, Some(seq)),
        None => (id, None),
    };

    if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let millis = millis.parse::<i64>().ok()?;

    let seq = match seq {
        Some(seq) if !seq.is_empty() && seq.bytes().all(|b| b.is_ascii_digit()) => {
            seq.parse::<u32>().ok()?
        }
        Some(_) => return None,
        None => 0,
    };

    Some((millis, seq))
}

/// Total order over ids: numeric segments first, then the raw text.
///
/// Timestamp-derived ids compare by value (`"101" > "100"`, `"5-10" > "5-9"`).
/// Ids that do not parse sort before those that do.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    (parse_id(a), a).cmp(&(parse_id(b), b))
}

fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}
