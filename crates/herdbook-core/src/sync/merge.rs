//! Conflict resolution between local and remote record copies.
//!
//! Two merge families exist, chosen per entity type. Types that carry a
//! usable timestamp are arbitrated record-by-record; the rest are
//! remote-authoritative and the downloaded set replaces the local one
//! wholesale (upload runs first in the same sync, which is what keeps
//! local-only records of those types alive).

use std::collections::{HashMap, HashSet};

use crate::models::{Animal, BreedingEvent, Herd};

/// A record type arbitrated by comparing the remote modification time
/// against a locally stored timestamp.
pub trait TimestampArbitrated: Clone {
    /// Identifier used to pair the local and remote copies of a record.
    fn record_key(&self) -> String;

    /// Local timestamp the remote modification time is compared against.
    fn arbitration_time(&self) -> i64;

    /// Whether an equal remote/local timestamp adopts the remote copy.
    const REMOTE_WINS_TIES: bool;
}

impl TimestampArbitrated for Animal {
    fn record_key(&self) -> String {
        self.id.as_str()
    }

    fn arbitration_time(&self) -> i64 {
        self.updated_at
    }

    const REMOTE_WINS_TIES: bool = true;
}

impl TimestampArbitrated for Herd {
    fn record_key(&self) -> String {
        self.id.as_str()
    }

    fn arbitration_time(&self) -> i64 {
        self.created_at
    }

    const REMOTE_WINS_TIES: bool = false;
}

impl TimestampArbitrated for BreedingEvent {
    fn record_key(&self) -> String {
        self.id.as_str()
    }

    fn arbitration_time(&self) -> i64 {
        self.created_at
    }

    const REMOTE_WINS_TIES: bool = false;
}

/// Merge a timestamp-arbitrated collection.
///
/// For each remote record the newer copy survives (ties per
/// `REMOTE_WINS_TIES`). Local records absent from the remote collection
/// are always preserved: absence never deletes for these types.
pub fn merge_arbitrated<T: TimestampArbitrated>(local: &[T], remote: Vec<(T, i64)>) -> Vec<T> {
    let local_by_key: HashMap<String, &T> = local
        .iter()
        .map(|record| (record.record_key(), record))
        .collect();

    let mut remote_keys: HashSet<String> = HashSet::with_capacity(remote.len());
    let mut merged = Vec::with_capacity(remote.len() + local.len());

    for (remote_record, remote_modified_at) in remote {
        let key = remote_record.record_key();
        if !remote_keys.insert(key.clone()) {
            // Duplicate document id; first occurrence already decided
            continue;
        }

        match local_by_key.get(&key) {
            Some(local_record) => {
                let remote_wins = remote_modified_at > local_record.arbitration_time()
                    || (T::REMOTE_WINS_TIES
                        && remote_modified_at == local_record.arbitration_time());
                if remote_wins {
                    merged.push(remote_record);
                } else {
                    merged.push((*local_record).clone());
                }
            }
            None => merged.push(remote_record),
        }
    }

    merged.extend(
        local
            .iter()
            .filter(|record| !remote_keys.contains(&record.record_key()))
            .cloned(),
    );

    merged
}

/// Merge a remote-authoritative collection: the downloaded set is the
/// merged set.
pub fn merge_remote_authoritative<T>(remote: Vec<T>) -> Vec<T> {
    remote
}
