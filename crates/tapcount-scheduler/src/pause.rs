// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tier pause state shared by the backpressure controller and workers.
//!
//! Each pausable tier holds an optional deadline. A pause expires on its own
//! once the deadline passes; there is no explicit resume. Re-pausing a tier
//! that is still paused leaves the original deadline untouched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tapcount_core::Tier;
use tokio::time::Instant;

/// Lock-free pause deadlines for MEDIUM and LOW.
///
/// Deadlines are stored as milliseconds since `origin`; `0` means unpaused.
#[derive(Debug)]
pub struct TierPauseState {
    origin: Instant,
    medium_until: AtomicU64,
    low_until: AtomicU64,
}

impl Default for TierPauseState {
    fn default() -> Self {
        Self::new()
    }
}

impl TierPauseState {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            medium_until: AtomicU64::new(0),
            low_until: AtomicU64::new(0),
        }
    }

    fn slot(&self, tier: Tier) -> Option<&AtomicU64> {
        match tier {
            Tier::High => None,
            Tier::Medium => Some(&self.medium_until),
            Tier::Low => Some(&self.low_until),
        }
    }

    fn now_ms(&self) -> u64 {
        // +1 keeps a real deadline distinct from the "unpaused" sentinel.
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX - 1) + 1
    }

    /// Pause `tier` for `duration`.
    ///
    /// Returns `true` if this call started a pause. `false` means the tier
    /// is never pausable or is already paused; the existing deadline is kept.
    pub fn pause(&self, tier: Tier, duration: Duration) -> bool {
        let Some(slot) = self.slot(tier) else {
            return false;
        };
        let now = self.now_ms();
        let until = now.saturating_add(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX));
        let mut current = slot.load(Ordering::Acquire);
        loop {
            if current > now {
                return false;
            }
            match slot.compare_exchange(current, until, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Whether `tier` is paused right now.
    pub fn is_paused(&self, tier: Tier) -> bool {
        self.paused_for(tier).is_some()
    }

    /// Time left on the pause, if any.
    pub fn paused_for(&self, tier: Tier) -> Option<Duration> {
        let until = self.slot(tier)?.load(Ordering::Acquire);
        let now = self.now_ms();
        (until > now).then(|| Duration::from_millis(until - now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn high_is_never_paused() {
        let state = TierPauseState::new();
        assert!(!state.pause(Tier::High, Duration::from_secs(60)));
        assert!(!state.is_paused(Tier::High));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_expires_after_cooldown() {
        let state = TierPauseState::new();
        assert!(state.pause(Tier::Low, Duration::from_secs(120)));
        assert!(state.is_paused(Tier::Low));
        assert!(!state.is_paused(Tier::Medium));

        tokio::time::advance(Duration::from_millis(119_999)).await;
        assert!(state.is_paused(Tier::Low));
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!state.is_paused(Tier::Low));
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_pause_keeps_first_deadline() {
        let state = TierPauseState::new();
        assert!(state.pause(Tier::Medium, Duration::from_secs(60)));

        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(!state.pause(Tier::Medium, Duration::from_secs(60)));
        assert_eq!(state.paused_for(Tier::Medium), Some(Duration::from_secs(10)));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!state.is_paused(Tier::Medium));
    }

    #[tokio::test(start_paused = true)]
    async fn tier_can_be_paused_again_after_expiry() {
        let state = TierPauseState::new();
        assert!(state.pause(Tier::Low, Duration::from_secs(1)));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(state.pause(Tier::Low, Duration::from_secs(1)));
        assert!(state.is_paused(Tier::Low));
    }
}
