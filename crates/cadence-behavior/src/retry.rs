//! Backoff bookkeeping for leaves that probe external candidates.
//!
//! A search leaf asks [`RetrySchedule::try_claim`] before probing a candidate and calls
//! [`RetrySchedule::mark_failed`] for every candidate it could not use. Failed candidates are
//! skipped for a linearly growing, jittered delay; records that have not been touched within the
//! validity window are swept by [`RetrySchedule::purge_stale`].

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Smallest delay increase per attempt (inclusive).
    pub min_increase: u64,
    /// Largest delay increase per attempt (exclusive).
    pub max_increase: u64,
    /// Cap on the accumulated delay.
    pub max_delay: u64,
    /// Records whose last attempt is at least this old are stale.
    pub validity_window: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_increase: 40,
            max_increase: 80,
            max_delay: 400,
            validity_window: 400,
        }
    }
}

impl RetryPolicy {
    fn jitter<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        if self.max_increase <= self.min_increase {
            self.min_increase
        } else {
            rng.gen_range(self.min_increase..self.max_increase)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryRecord {
    last_attempt_tick: u64,
    next_allowed_tick: u64,
    current_delay: u64,
}

impl RetryRecord {
    pub fn last_attempt_tick(&self) -> u64 {
        self.last_attempt_tick
    }

    pub fn next_allowed_tick(&self) -> u64 {
        self.next_allowed_tick
    }

    pub fn current_delay(&self) -> u64 {
        self.current_delay
    }

    pub fn mark_attempt<R: Rng + ?Sized>(&mut self, tick: u64, policy: &RetryPolicy, rng: &mut R) {
        self.last_attempt_tick = tick;
        self.current_delay = self
            .current_delay
            .saturating_add(policy.jitter(rng))
            .min(policy.max_delay);
        self.next_allowed_tick = tick.saturating_add(self.current_delay);
    }

    pub fn should_retry(&self, tick: u64) -> bool {
        tick >= self.next_allowed_tick
    }

    pub fn is_still_valid(&self, tick: u64, policy: &RetryPolicy) -> bool {
        tick.saturating_sub(self.last_attempt_tick) < policy.validity_window
    }
}

/// Per-candidate retry records, owned by a single node.
#[derive(Debug, Clone, Default)]
pub struct RetrySchedule<K> {
    policy: RetryPolicy,
    records: BTreeMap<K, RetryRecord>,
}

impl<K: Ord + Clone> RetrySchedule<K> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            records: BTreeMap::new(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, candidate: &K) -> Option<&RetryRecord> {
        self.records.get(candidate)
    }

    /// `true` for untracked candidates and for tracked ones whose backoff has elapsed.
    pub fn should_retry(&self, candidate: &K, tick: u64) -> bool {
        self.records
            .get(candidate)
            .map_or(true, |record| record.should_retry(tick))
    }

    pub fn mark_attempt<R: Rng + ?Sized>(&mut self, candidate: K, tick: u64, rng: &mut R) {
        self.records
            .entry(candidate)
            .or_default()
            .mark_attempt(tick, &self.policy, rng);
    }

    /// Candidate filter for a search pass.
    ///
    /// Untracked candidates pass untouched. Tracked candidates still backing off are rejected;
    /// those whose backoff elapsed pass and have the attempt recorded, growing their delay.
    pub fn try_claim<R: Rng + ?Sized>(&mut self, candidate: &K, tick: u64, rng: &mut R) -> bool {
        let Some(record) = self.records.get_mut(candidate) else {
            return true;
        };
        if !record.should_retry(tick) {
            return false;
        }
        record.mark_attempt(tick, &self.policy, rng);
        true
    }

    /// Start tracking every candidate not tracked yet, with an initial attempt at `tick`.
    pub fn mark_failed<R, I>(&mut self, candidates: I, tick: u64, rng: &mut R)
    where
        R: Rng + ?Sized,
        I: IntoIterator<Item = K>,
    {
        for candidate in candidates {
            if !self.records.contains_key(&candidate) {
                self.mark_attempt(candidate, tick, rng);
            }
        }
    }

    /// Drop records outside the validity window. Returns how many were dropped.
    pub fn purge_stale(&mut self, tick: u64) -> usize {
        let before = self.records.len();
        let policy = self.policy;
        self.records
            .retain(|_, record| record.is_still_valid(tick, &policy));
        before - self.records.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanThrottleConfig {
    /// Upper bound (exclusive) of the random offset before the very first scan.
    pub initial_jitter: u64,
    pub interval: u64,
    /// Upper bound (exclusive) of the random extra delay added to `interval`.
    pub jitter: u64,
    /// Extra delay when the caller reports the agent as stuck.
    pub stuck_penalty: u64,
}

impl Default for ScanThrottleConfig {
    fn default() -> Self {
        Self {
            initial_jitter: 20,
            interval: 20,
            jitter: 20,
            stuck_penalty: 200,
        }
    }
}

/// Paces an expensive search so a leaf scans every `interval + jitter` ticks at most.
///
/// The first call only schedules the first scan, spreading agents created on the same tick.
#[derive(Debug, Clone, Default)]
pub struct ScanThrottle {
    config: ScanThrottleConfig,
    next_scan: Option<u64>,
}

fn below<R: Rng + ?Sized>(bound: u64, rng: &mut R) -> u64 {
    if bound == 0 {
        0
    } else {
        rng.gen_range(0..bound)
    }
}

impl ScanThrottle {
    pub fn new(config: ScanThrottleConfig) -> Self {
        Self {
            config,
            next_scan: None,
        }
    }

    pub fn next_scan(&self) -> Option<u64> {
        self.next_scan
    }

    pub fn reset(&mut self) {
        self.next_scan = None;
    }

    /// `true` when a scan may run now; schedules the following one.
    pub fn ready<R: Rng + ?Sized>(&mut self, tick: u64, stuck: bool, rng: &mut R) -> bool {
        match self.next_scan {
            None => {
                self.next_scan = Some(tick.saturating_add(below(self.config.initial_jitter, rng)));
                false
            }
            Some(at) if tick < at => false,
            Some(_) => {
                let mut next = tick
                    .saturating_add(self.config.interval)
                    .saturating_add(below(self.config.jitter, rng));
                if stuck {
                    next = next.saturating_add(self.config.stuck_penalty);
                }
                self.next_scan = Some(next);
                true
            }
        }
    }
}
