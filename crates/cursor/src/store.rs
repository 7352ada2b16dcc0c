//! TTL-bounded bookkeeping of issued cursors.
//!
//! The codec is self-validating, so nothing here affects correctness;
//! this store only feeds adoption/replay telemetry. Entries are keyed by
//! the signature half of the cursor (the payload half repeats offsets)
//! and evicted lazily on access once older than the TTL. Staleness
//! therefore only skews telemetry, never pagination results.

use crate::codec::CURSOR_TTL;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// In-memory record of recently issued cursors.
///
/// Shareable via `Arc<CursorStore>`; interior mutability through a
/// coarse `parking_lot::Mutex`, which is plenty for counter-style access.
#[derive(Debug)]
pub struct CursorStore {
    ttl: Duration,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    issued_total: u64,
    replays_seen: u64,
}

#[derive(Debug)]
struct Entry {
    issued: Instant,
    presentations: u64,
}

impl Default for CursorStore {
    fn default() -> Self {
        Self::new(CURSOR_TTL)
    }
}

impl CursorStore {
    /// Create a store with a custom TTL (tests shorten it).
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Record an issued cursor.
    pub fn record(&self, cursor: &str) {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        Self::evict(&mut inner, now, self.ttl);
        inner.entries.insert(
            key(cursor).to_string(),
            Entry {
                issued: now,
                presentations: 0,
            },
        );
        inner.issued_total += 1;
    }

    /// Whether this cursor was issued within the TTL window.
    ///
    /// The first presentation of a cursor is the expected next-page
    /// request; only second-and-later presentations count as replays.
    pub fn seen(&self, cursor: &str) -> bool {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        Self::evict(inner, Instant::now(), self.ttl);
        match inner.entries.get_mut(key(cursor)) {
            Some(entry) => {
                let replay = entry.presentations > 0;
                entry.presentations += 1;
                if replay {
                    inner.replays_seen += 1;
                }
                true
            }
            None => false,
        }
    }

    /// Cursors currently tracked (post-eviction).
    pub fn live_count(&self) -> usize {
        let mut inner = self.inner.lock();
        Self::evict(&mut inner, Instant::now(), self.ttl);
        inner.entries.len()
    }

    /// Total cursors issued over the store's lifetime.
    pub fn issued_total(&self) -> u64 {
        self.inner.lock().issued_total
    }

    /// Total times a tracked cursor was observed again.
    pub fn replays_seen(&self) -> u64 {
        self.inner.lock().replays_seen
    }

    fn evict(inner: &mut Inner, now: Instant, ttl: Duration) {
        inner
            .entries
            .retain(|_, entry| now.duration_since(entry.issued) <= ttl);
    }
}

/// The signature half uniquely identifies a cursor issuance.
fn key(cursor: &str) -> &str {
    cursor.split_once('.').map_or(cursor, |(_, mac)| mac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_cursor;

    #[test]
    fn recorded_cursor_is_seen() {
        let store = CursorStore::default();
        let cursor = encode_cursor(50, "secret");
        assert!(!store.seen(&cursor));
        store.record(&cursor);
        assert!(store.seen(&cursor));
        assert_eq!(store.issued_total(), 1);
    }

    #[test]
    fn first_presentation_is_not_a_replay() {
        /*
        GIVEN an issued cursor
        WHEN it is presented once (the normal next-page request) and then
             presented twice more
        THEN only the second and third presentations count as replays
        */
        let store = CursorStore::default();
        let cursor = encode_cursor(50, "secret");
        store.record(&cursor);

        assert!(store.seen(&cursor));
        assert_eq!(store.replays_seen(), 0);

        assert!(store.seen(&cursor));
        assert!(store.seen(&cursor));
        assert_eq!(store.replays_seen(), 2);
    }

    #[test]
    fn entries_evict_after_ttl() {
        let store = CursorStore::new(Duration::from_millis(10));
        let cursor = encode_cursor(1, "secret");
        store.record(&cursor);
        assert_eq!(store.live_count(), 1);

        std::thread::sleep(Duration::from_millis(25));
        assert!(!store.seen(&cursor));
        assert_eq!(store.live_count(), 0);
        // Lifetime issuance count survives eviction.
        assert_eq!(store.issued_total(), 1);
    }

    #[test]
    fn store_is_shareable_across_threads() {
        let store = std::sync::Arc::new(CursorStore::default());
        let handles: Vec<_> = (0..4u64)
            .map(|i| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    store.record(&encode_cursor(i, "secret"));
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread join");
        }
        assert_eq!(store.issued_total(), 4);
    }
}
