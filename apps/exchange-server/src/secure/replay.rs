// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Replay protection for sealed envelopes.
//!
//! An envelope is accepted once: its timestamp must fall within the
//! configured window around the server clock, and its `(sender, nonce)` pair
//! must not have been seen before. Seen pairs live in a bounded LRU. A pair
//! is only forgotten once its timestamp has left the window, at which point a
//! replay of it is rejected as stale anyway. When the LRU is full of pairs
//! that are all still live, new envelopes are refused until some expire.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;

use lru::LruCache;

use super::envelope::NONCE_LEN;
use super::keys::PUBLIC_KEY_LEN;

/// Default number of remembered `(sender, nonce)` pairs.
pub const DEFAULT_CAPACITY: usize = 100_000;

type SeenKey = ([u8; PUBLIC_KEY_LEN], [u8; NONCE_LEN]);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReplayError {
    #[error("envelope timestamp outside accepted window (skew {skew_ms} ms)")]
    Stale { skew_ms: u64 },
    #[error("envelope already seen")]
    Duplicate,
    #[error("replay cache is full of live envelopes")]
    Saturated,
}

pub struct ReplayGuard {
    window: Duration,
    seen: Mutex<LruCache<SeenKey, u64>>,
}

impl ReplayGuard {
    pub fn new(window: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            window,
            seen: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Record the envelope as seen, or reject it.
    pub fn check(
        &self,
        sender: [u8; PUBLIC_KEY_LEN],
        nonce: [u8; NONCE_LEN],
        timestamp_ms: u64,
        now_ms: u64,
    ) -> Result<(), ReplayError> {
        let skew_ms = now_ms.abs_diff(timestamp_ms);
        if u128::from(skew_ms) > self.window.as_millis() {
            return Err(ReplayError::Stale { skew_ms });
        }

        let mut seen = self
            .seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if seen.contains(&(sender, nonce)) {
            return Err(ReplayError::Duplicate);
        }

        if seen.len() >= seen.cap().get() {
            self.evict_expired(&mut seen, now_ms);
            if seen.len() >= seen.cap().get() {
                return Err(ReplayError::Saturated);
            }
        }
        seen.put((sender, nonce), timestamp_ms);
        Ok(())
    }

    fn is_expired(&self, timestamp_ms: u64, now_ms: u64) -> bool {
        u128::from(now_ms.saturating_sub(timestamp_ms)) > self.window.as_millis()
    }

    /// Drop every pair whose timestamp has left the window.
    ///
    /// Insertion order does not follow timestamp order, so the cheap pass
    /// from the LRU end is followed by a full scan when it frees nothing.
    fn evict_expired(&self, seen: &mut LruCache<SeenKey, u64>, now_ms: u64) {
        let mut freed = false;
        while let Some((_, &ts)) = seen.peek_lru() {
            if !self.is_expired(ts, now_ms) {
                break;
            }
            seen.pop_lru();
            freed = true;
        }
        if freed {
            return;
        }

        let expired: Vec<SeenKey> = seen
            .iter()
            .filter(|(_, ts)| self.is_expired(**ts, now_ms))
            .map(|(key, _)| *key)
            .collect();
        for key in expired {
            seen.pop(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000_000;

    fn guard() -> ReplayGuard {
        ReplayGuard::new(Duration::from_secs(300), 16)
    }

    #[test]
    fn accepts_fresh_envelope_once() {
        let guard = guard();
        let sender = [2u8; PUBLIC_KEY_LEN];
        let nonce = [7u8; NONCE_LEN];

        assert!(guard.check(sender, nonce, NOW, NOW).is_ok());
        assert_eq!(
            guard.check(sender, nonce, NOW, NOW + 10),
            Err(ReplayError::Duplicate)
        );
    }

    #[test]
    fn same_nonce_from_other_sender_is_distinct() {
        let guard = guard();
        let nonce = [7u8; NONCE_LEN];

        assert!(guard.check([2u8; PUBLIC_KEY_LEN], nonce, NOW, NOW).is_ok());
        assert!(guard.check([3u8; PUBLIC_KEY_LEN], nonce, NOW, NOW).is_ok());
    }

    fn fill(guard: &ReplayGuard, from: u8, count: u8, ts: u64, now: u64) {
        for i in 0..count {
            let sender = [from.wrapping_add(i); PUBLIC_KEY_LEN];
            guard.check(sender, [0u8; NONCE_LEN], ts, now).unwrap();
        }
    }

    #[test]
    fn full_cache_never_forgets_live_envelopes() {
        let guard = guard();
        let victim = [200u8; PUBLIC_KEY_LEN];
        let nonce = [9u8; NONCE_LEN];

        guard.check(victim, nonce, NOW, NOW).unwrap();
        fill(&guard, 10, 15, NOW + 1, NOW + 1);

        assert_eq!(
            guard.check(victim, nonce, NOW, NOW + 10_000),
            Err(ReplayError::Duplicate)
        );
        assert_eq!(
            guard.check([99u8; PUBLIC_KEY_LEN], nonce, NOW + 2, NOW + 10_000),
            Err(ReplayError::Saturated)
        );
        assert_eq!(
            guard.check(victim, nonce, NOW, NOW + 20_000),
            Err(ReplayError::Duplicate)
        );
    }

    #[test]
    fn full_cache_reclaims_expired_envelopes() {
        let guard = guard();
        fill(&guard, 10, 16, NOW, NOW);

        let later = NOW + 301_000;
        assert!(guard
            .check([99u8; PUBLIC_KEY_LEN], [1u8; NONCE_LEN], later, later)
            .is_ok());
    }

    #[test]
    fn full_scan_finds_expired_entries_behind_live_ones() {
        let guard = guard();
        // Future-dated but in-window entry sits at the LRU end.
        guard
            .check([1u8; PUBLIC_KEY_LEN], [0u8; NONCE_LEN], NOW + 200_000, NOW)
            .unwrap();
        fill(&guard, 10, 15, NOW, NOW);

        let later = NOW + 301_000;
        assert!(guard
            .check([99u8; PUBLIC_KEY_LEN], [1u8; NONCE_LEN], later, later)
            .is_ok());
        assert_eq!(
            guard.check([1u8; PUBLIC_KEY_LEN], [0u8; NONCE_LEN], NOW + 200_000, later),
            Err(ReplayError::Duplicate)
        );
    }

    #[test]
    fn rejects_outside_window_in_both_directions() {
        let guard = guard();
        let sender = [2u8; PUBLIC_KEY_LEN];

        let old = NOW - 301_000;
        assert!(matches!(
            guard.check(sender, [1u8; NONCE_LEN], old, NOW),
            Err(ReplayError::Stale { .. })
        ));

        let future = NOW + 301_000;
        assert!(matches!(
            guard.check(sender, [2u8; NONCE_LEN], future, NOW),
            Err(ReplayError::Stale { .. })
        ));

        assert!(guard
            .check(sender, [3u8; NONCE_LEN], NOW - 299_000, NOW)
            .is_ok());
    }
}
