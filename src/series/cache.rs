// Short-lived cache of navigation results keyed by (host, range, offset).

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::window::Range;
use crate::models::{HostId, NavigationResult};

/// Expired entries are swept once the map grows past this.
const SWEEP_THRESHOLD: usize = 1024;

type Key = (HostId, Range, u64);

pub struct NavigationCache {
    ttl: Duration,
    entries: Mutex<HashMap<Key, (NavigationResult, Instant)>>,
}

impl NavigationCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub fn get(&self, host_id: HostId, range: Range, offset: u64) -> Option<NavigationResult> {
        if !self.is_enabled() {
            return None;
        }
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let (result, stored_at) = entries.get(&(host_id, range, offset))?;
        (stored_at.elapsed() < self.ttl).then_some(*result)
    }

    pub fn insert(&self, host_id: HostId, range: Range, offset: u64, result: NavigationResult) {
        if !self.is_enabled() {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= SWEEP_THRESHOLD {
            let ttl = self.ttl;
            entries.retain(|_, (_, stored_at)| stored_at.elapsed() < ttl);
        }
        entries.insert((host_id, range, offset), (result, Instant::now()));
    }

    /// Drops every cached result for `host_id` (new samples may have filled a window).
    pub fn invalidate_host(&self, host_id: HostId) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(h, _, _), _| *h != host_id);
    }
}
