// Populated-window index: per-host bitset of fixed-width time buckets that hold at least one
// sample. Marks only ever get set, except when retention pruning trims the oldest buckets.
//
// Buckets are aligned to the epoch, chart windows are aligned to "now", so the index can only
// prove an interval empty. It is never used to claim an interval has data.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::models::HostId;

const WORD_BITS: i64 = 64;

#[derive(Debug, Default)]
struct HostBuckets {
    /// Word number (bucket / 64) of `words[0]`.
    first_word: i64,
    words: VecDeque<u64>,
}

impl HostBuckets {
    fn mark(&mut self, bucket: i64) {
        let word = bucket.div_euclid(WORD_BITS);
        let bit = bucket.rem_euclid(WORD_BITS);
        if self.words.is_empty() {
            self.first_word = word;
            self.words.push_back(0);
        }
        while word < self.first_word {
            self.words.push_front(0);
            self.first_word -= 1;
        }
        while word >= self.first_word + self.words.len() as i64 {
            self.words.push_back(0);
        }
        let idx = (word - self.first_word) as usize;
        self.words[idx] |= 1u64 << bit;
    }

    fn any_in(&self, lo: i64, hi: i64) -> bool {
        if self.words.is_empty() || lo > hi {
            return false;
        }
        let last_word = self.first_word + self.words.len() as i64 - 1;
        let (lo_word, hi_word) = (lo.div_euclid(WORD_BITS), hi.div_euclid(WORD_BITS));
        for word in lo_word.max(self.first_word)..=hi_word.min(last_word) {
            let mut bits = self.words[(word - self.first_word) as usize];
            if word == lo_word {
                bits &= u64::MAX << lo.rem_euclid(WORD_BITS);
            }
            if word == hi_word {
                bits &= u64::MAX >> (WORD_BITS - 1 - hi.rem_euclid(WORD_BITS));
            }
            if bits != 0 {
                return true;
            }
        }
        false
    }

    /// Clears every bucket below `cutoff_bucket` and drops emptied leading words.
    fn trim_before(&mut self, cutoff_bucket: i64) {
        let cutoff_word = cutoff_bucket.div_euclid(WORD_BITS);
        while self.first_word < cutoff_word && !self.words.is_empty() {
            self.words.pop_front();
            self.first_word += 1;
        }
        if self.first_word == cutoff_word
            && let Some(front) = self.words.front_mut()
        {
            *front &= u64::MAX << cutoff_bucket.rem_euclid(WORD_BITS);
        }
        while self.words.front() == Some(&0) {
            self.words.pop_front();
            self.first_word += 1;
        }
    }

    fn populated_buckets(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

pub struct PopulatedIndex {
    bucket_ms: i64,
    hosts: RwLock<HashMap<HostId, Arc<RwLock<HostBuckets>>>>,
    /// Set once the index has been hydrated from the full store; before that it proves nothing.
    complete: AtomicBool,
}

impl PopulatedIndex {
    pub fn new(bucket_secs: u32) -> Self {
        Self {
            bucket_ms: i64::from(bucket_secs.max(1)) * 1000,
            hosts: RwLock::new(HashMap::new()),
            complete: AtomicBool::new(false),
        }
    }

    pub fn bucket_secs(&self) -> u32 {
        (self.bucket_ms / 1000) as u32
    }

    fn bucket_of(&self, ts_ms: i64) -> i64 {
        ts_ms.div_euclid(self.bucket_ms)
    }

    fn host_entry(&self, host_id: HostId) -> Arc<RwLock<HostBuckets>> {
        if let Some(entry) = self
            .hosts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&host_id)
        {
            return entry.clone();
        }
        self.hosts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(host_id)
            .or_default()
            .clone()
    }

    /// Marks the bucket (as returned by the store's bucket query) as populated.
    pub fn mark_bucket(&self, host_id: HostId, bucket: i64) {
        self.host_entry(host_id)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .mark(bucket);
    }

    pub fn mark(&self, host_id: HostId, reported_at: DateTime<Utc>) {
        self.mark_bucket(host_id, self.bucket_of(reported_at.timestamp_millis()));
    }

    /// Declares every stored sample indexed; from now on the index may rule out probes.
    pub fn mark_complete(&self) {
        self.complete.store(true, Ordering::Release);
    }

    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    /// True only when the index proves `host_id` has no sample in `[start, end)`.
    pub fn rules_out(&self, host_id: HostId, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if !self.is_complete() || start >= end {
            return false;
        }
        let entry = {
            let hosts = self.hosts.read().unwrap_or_else(PoisonError::into_inner);
            match hosts.get(&host_id) {
                Some(entry) => entry.clone(),
                None => return true,
            }
        };
        let lo = self.bucket_of(start.timestamp_millis());
        let hi = self.bucket_of(end.timestamp_millis() - 1);
        !entry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .any_in(lo, hi)
    }

    /// Forgets buckets lying entirely before `cutoff` (retention pruning).
    pub fn trim_before(&self, cutoff: DateTime<Utc>) {
        let cutoff_bucket = self.bucket_of(cutoff.timestamp_millis());
        let entries: Vec<_> = self
            .hosts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for entry in entries {
            entry
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .trim_before(cutoff_bucket);
        }
    }

    /// Number of populated buckets tracked for `host_id`.
    pub fn populated_buckets(&self, host_id: HostId) -> usize {
        self.hosts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&host_id)
            .map(|e| {
                e.read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .populated_buckets()
            })
            .unwrap_or(0)
    }
}
