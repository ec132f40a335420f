//! Suppression whitelist for self-generated input.
//!
//! # Why a whitelist? (for beginners)
//!
//! When the application *synthesizes* input — emulating a Ctrl+C to copy a
//! value, or a wheel scroll on its own behalf — the global hook sees that
//! synthetic input come right back, indistinguishable from the user.
//! Before emitting, the application registers the gesture here; the
//! capture layer consults [`SuppressionRegistry::should_process`] ahead of
//! classification and drops whitelisted gestures instead of re-processing
//! them as new user input.
//!
//! Registration is reference-counted: two concurrent emitters of the same
//! gesture each hold a token, and suppression lifts only when the last one
//! releases.  When the count reaches zero, the entry is *retained* with a
//! release timestamp, because the OS may still have the real event queued:
//! for a short grace window (default 10 ms) the gesture stays suppressed
//! to absorb that delivery race.
//!
//! # Concurrency
//!
//! Arbitrarily many application threads add and release entries while the
//! hook thread queries concurrently.  One `RwLock` guards the whole table;
//! `should_process` takes the read lock only and never mutates, keeping
//! hook-thread latency bounded (the expected call volume does not justify
//! per-entry locking).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::{error, trace};

use crate::domain::gesture::{MatchMode, NormalizedGesture};

/// Tunables for the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuppressionConfig {
    /// How long a gesture stays suppressed after its last token is
    /// released.  A policy choice, not a law of nature; the default
    /// matches observed delivery races on Windows.
    pub grace_period: Duration,
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_millis(10),
        }
    }
}

#[derive(Debug)]
struct WhitelistEntry {
    ref_count: u32,
    /// Set when `ref_count` last dropped to zero.
    last_exclusion: Option<Instant>,
    mode: MatchMode,
}

#[derive(Debug)]
struct RegistryInner {
    entries: RwLock<HashMap<NormalizedGesture, WhitelistEntry>>,
    grace_period: Duration,
}

/// Reference-counted, time-windowed whitelist of gestures to suppress.
///
/// Cheap to clone; clones share the same table.
#[derive(Debug, Clone)]
pub struct SuppressionRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for SuppressionRegistry {
    fn default() -> Self {
        Self::new(SuppressionConfig::default())
    }
}

impl SuppressionRegistry {
    pub fn new(config: SuppressionConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                entries: RwLock::new(HashMap::new()),
                grace_period: config.grace_period,
            }),
        }
    }

    /// Whitelists `gesture`, incrementing its reference count (creating
    /// the entry at 1 if absent).  Never fails.
    ///
    /// Suppression lasts until the returned token — and every other token
    /// for the same gesture — is dropped, plus the grace window.
    pub fn add_to_whitelist(&self, gesture: NormalizedGesture, mode: MatchMode) -> WhitelistToken {
        let key = match mode {
            MatchMode::Exact => gesture,
            MatchMode::IgnoreModifiers => gesture.strip_modifiers(),
        };

        let mut entries = self.inner.entries.write().expect("whitelist lock poisoned");
        let entry = entries.entry(key).or_insert(WhitelistEntry {
            ref_count: 0,
            last_exclusion: None,
            mode,
        });
        entry.ref_count += 1;
        // Concurrent registrants may disagree on the mode; the broader
        // one wins for the shared entry.
        if mode == MatchMode::IgnoreModifiers {
            entry.mode = mode;
        }
        trace!(?key, ref_count = entry.ref_count, "gesture whitelisted");

        WhitelistToken {
            inner: Arc::clone(&self.inner),
            key,
            released: false,
        }
    }

    /// Decides whether the capture layer should forward `gesture` into
    /// the application.
    ///
    /// Returns `false` (suppress) if a matching entry is actively
    /// whitelisted (`ref_count > 0`) or was released within the grace
    /// window.  `is_press_phase` marks queries for resolved key-press
    /// characters, which carry no reliable modifier information of their
    /// own; those match exact entries modifier-insensitively.
    pub fn should_process(&self, gesture: &NormalizedGesture, is_press_phase: bool) -> bool {
        let entries = self.inner.entries.read().expect("whitelist lock poisoned");
        let grace = self.inner.grace_period;

        // Exact-key hit: covers Exact entries, and IgnoreModifiers
        // entries when the query itself carries no modifiers.
        if let Some(entry) = entries.get(gesture) {
            if entry_suppresses(entry, grace) {
                return false;
            }
        }

        let stripped = gesture.strip_modifiers();
        if stripped != *gesture {
            if let Some(entry) = entries.get(&stripped) {
                let mode_matches = entry.mode == MatchMode::IgnoreModifiers || is_press_phase;
                if mode_matches && entry_suppresses(entry, grace) {
                    return false;
                }
            }
        }

        true
    }

    /// Drops entries whose grace window has elapsed.  An optimization
    /// only — `should_process` is correct without it.
    pub fn purge_expired(&self) {
        let mut entries = self.inner.entries.write().expect("whitelist lock poisoned");
        let grace = self.inner.grace_period;
        entries.retain(|_, entry| entry_suppresses(entry, grace));
    }

    /// Number of table entries, live or in grace.  Diagnostics only.
    pub fn len(&self) -> usize {
        self.inner
            .entries
            .read()
            .expect("whitelist lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn entry_suppresses(entry: &WhitelistEntry, grace: Duration) -> bool {
    if entry.ref_count > 0 {
        return true;
    }
    entry
        .last_exclusion
        .map(|at| at.elapsed() < grace)
        .unwrap_or(false)
}

impl RegistryInner {
    fn release(&self, key: &NormalizedGesture) {
        let mut entries = self.entries.write().expect("whitelist lock poisoned");
        let Some(entry) = entries.get_mut(key) else {
            debug_assert!(false, "whitelist release for unknown gesture {key:?}");
            error!(?key, "whitelist release for unknown gesture");
            return;
        };
        if entry.ref_count == 0 {
            // A release without a matching add is a caller bug: loud in
            // debug builds, clamped (never negative) in production.
            debug_assert!(false, "whitelist ref count underflow for {key:?}");
            error!(?key, "whitelist ref count underflow; clamping at zero");
            return;
        }
        entry.ref_count -= 1;
        if entry.ref_count == 0 {
            entry.last_exclusion = Some(Instant::now());
            trace!(?key, "gesture left whitelist; grace window opened");
        }
    }
}

/// RAII token returned by [`SuppressionRegistry::add_to_whitelist`].
///
/// Dropping it releases one reference.  Callers hold the gesture only by
/// value; the entry's lifetime stays owned by the registry.
#[derive(Debug)]
pub struct WhitelistToken {
    inner: Arc<RegistryInner>,
    key: NormalizedGesture,
    released: bool,
}

impl WhitelistToken {
    /// Releases the reference now instead of at drop time.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.inner.release(&self.key);
        }
    }
}

impl Drop for WhitelistToken {
    fn drop(&mut self) {
        self.release_once();
    }
}
