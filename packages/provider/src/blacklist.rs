//! Per-destination exponential-backoff records.
//!
//! Each destination that has failed recently owns one packed atomic word:
//! the low 16 bits hold the failure count (saturating), the remaining bits
//! hold the millisecond deadline before which the destination is excluded
//! from selection. Updates are CAS loops, so concurrent failure reports
//! against the same destination never lose an increment, and unrelated
//! destinations never contend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use treeline_wire::Destination;

const COUNT_BITS: u32 = 16;
const COUNT_MASK: u64 = (1 << COUNT_BITS) - 1;

/// Base backoff delay in milliseconds.
const BACKOFF_UNIT_MS: u64 = 65536;

/// Delay exponent cap: the delay saturates at `2^13 * 65536` ms, about
/// six days.
const MAX_BACKOFF_EXPONENT: u64 = 13;

fn pack(deadline_ms: u64, count: u64) -> u64 {
    (deadline_ms << COUNT_BITS) | count.min(COUNT_MASK)
}

fn unpack_deadline(entry: u64) -> u64 {
    entry >> COUNT_BITS
}

fn unpack_count(entry: u64) -> u64 {
    entry & COUNT_MASK
}

/// Destinations currently in backoff, shared across every context derived
/// from one provider environment.
#[derive(Debug)]
pub struct Blacklist {
    entries: RwLock<HashMap<Destination, Arc<AtomicU64>>>,
}

impl Blacklist {
    pub fn new() -> Self {
        Blacklist { entries: RwLock::new(HashMap::new()) }
    }

    fn entry(&self, destination: &Destination) -> Arc<AtomicU64> {
        if let Some(entry) =
            self.entries.read().expect("blacklist poisoned").get(destination)
        {
            return Arc::clone(entry);
        }
        let mut entries = self.entries.write().expect("blacklist poisoned");
        Arc::clone(entries.entry(destination.clone()).or_default())
    }

    /// Record one connectivity failure against a destination.
    ///
    /// The Nth consecutive failure (0-indexed) pushes the deadline to
    /// `now + 2^min(N, 13) * 65536` ms and stores failure count `N + 1`.
    /// Returns the new failure count.
    pub fn record_failure(&self, destination: &Destination, now_ms: u64) -> u64 {
        let entry = self.entry(destination);
        let mut current = entry.load(Ordering::Acquire);
        loop {
            let failures = unpack_count(current);
            let delay = BACKOFF_UNIT_MS << failures.min(MAX_BACKOFF_EXPONENT);
            let updated = pack(now_ms + delay, failures + 1);
            match entry.compare_exchange_weak(
                current,
                updated,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    log::debug!(
                        "destination {} blacklisted for {}ms (failure {})",
                        destination,
                        delay,
                        failures + 1
                    );
                    return unpack_count(updated);
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Whether a destination is currently excluded from selection.
    pub fn is_blocked(&self, destination: &Destination, now_ms: u64) -> bool {
        match self.deadline(destination) {
            Some(deadline) => now_ms < deadline,
            None => false,
        }
    }

    /// The destination's retry deadline, if it has ever failed.
    pub fn deadline(&self, destination: &Destination) -> Option<u64> {
        self.entries
            .read()
            .expect("blacklist poisoned")
            .get(destination)
            .map(|entry| unpack_deadline(entry.load(Ordering::Acquire)))
    }

    /// The destination's recorded failure count.
    pub fn failure_count(&self, destination: &Destination) -> u64 {
        self.entries
            .read()
            .expect("blacklist poisoned")
            .get(destination)
            .map(|entry| unpack_count(entry.load(Ordering::Acquire)))
            .unwrap_or(0)
    }

    /// Drop entries whose retry window has elapsed. An expired entry is
    /// inert either way; pruning just bounds the map.
    pub fn sweep_expired(&self, now_ms: u64) {
        let mut entries = self.entries.write().expect("blacklist poisoned");
        entries.retain(|_, entry| unpack_deadline(entry.load(Ordering::Acquire)) > now_ms);
    }
}

impl Default for Blacklist {
    fn default() -> Self {
        Self::new()
    }
}
