//! Credential Pool
//!
//! Fixed set of interchangeable API keys with per-key usage and cooldown state.
//! The pool is the single source of truth for availability; a key is never
//! removed, a cooldown only hides it until the window expires.

use crate::error::{KeywheelError, Result};
use crate::rotation::strategy::SelectionMethod;
use parking_lot::Mutex;
use rand::Rng;
use std::time::{Duration, Instant};

/// A single credential with its scheduling state
#[derive(Debug, Clone)]
pub struct KeyRecord {
    /// Index of this key in the pool
    id: usize,

    /// The credential value, fixed at construction
    credential: String,

    /// Number of times this key has been selected
    pub(crate) usage_count: u64,

    /// If set and in the future, the key is excluded from selection
    cooldown_until: Option<Instant>,
}

impl KeyRecord {
    fn new(id: usize, credential: String) -> Self {
        Self {
            id,
            credential,
            usage_count: 0,
            cooldown_until: None,
        }
    }

    /// Pool index of this key
    pub fn id(&self) -> usize {
        self.id
    }

    /// The credential value
    pub fn credential(&self) -> &str {
        &self.credential
    }

    /// How often this key has been selected
    pub fn usage_count(&self) -> u64 {
        self.usage_count
    }

    /// Availability check that clears an expired cooldown as a side effect
    pub(crate) fn check_available(&mut self, now: Instant) -> bool {
        match self.cooldown_until {
            None => true,
            Some(until) if now >= until => {
                self.cooldown_until = None;
                true
            }
            Some(_) => false,
        }
    }
}

/// Mutable pool state, always accessed under the pool mutex
pub(crate) struct PoolState {
    pub(crate) keys: Vec<KeyRecord>,
    /// Shared round-robin cursor; points at the most recently visited index
    pub(crate) cursor: usize,
}

impl PoolState {
    /// Indices of all currently available keys, clearing expired cooldowns
    pub(crate) fn available_indices(&mut self, now: Instant) -> Vec<usize> {
        let mut available = Vec::with_capacity(self.keys.len());
        for key in &mut self.keys {
            if key.check_available(now) {
                available.push(key.id);
            }
        }
        available
    }
}

/// Pool of credentials with cooldown tracking
///
/// Every selection or failure report runs as one atomic transaction under a
/// single mutex, so usage counts, cooldowns and the rotation cursor can never
/// be observed mid-update.
pub struct KeyPool {
    state: Mutex<PoolState>,
    cooldown: Duration,
}

impl KeyPool {
    /// Create a pool from an ordered credential list and a cooldown window
    pub fn new(credentials: Vec<String>, cooldown: Duration) -> Result<Self> {
        if credentials.is_empty() {
            return Err(KeywheelError::InvalidConfiguration(
                "credential pool must contain at least one key".to_string(),
            ));
        }

        let keys: Vec<KeyRecord> = credentials
            .into_iter()
            .enumerate()
            .map(|(id, credential)| KeyRecord::new(id, credential))
            .collect();

        // Cursor sits on the last index so the first advance lands on key 0.
        let cursor = keys.len() - 1;

        Ok(Self {
            state: Mutex::new(PoolState { keys, cursor }),
            cooldown,
        })
    }

    /// Number of keys in the pool
    pub fn len(&self) -> usize {
        self.state.lock().keys.len()
    }

    /// Always false; the constructor rejects empty pools
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured cooldown window
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Check whether a key is selectable, clearing an expired cooldown
    ///
    /// An out-of-range id is reported as unavailable.
    pub fn is_available(&self, id: usize, now: Instant) -> bool {
        let mut state = self.state.lock();
        match state.keys.get_mut(id) {
            Some(key) => key.check_available(now),
            None => false,
        }
    }

    /// Increment the usage counter of a key
    ///
    /// Unknown ids are ignored.
    pub fn record_use(&self, id: usize) {
        let mut state = self.state.lock();
        if let Some(key) = state.keys.get_mut(id) {
            key.usage_count += 1;
        }
    }

    /// Put a key into cooldown starting at `now`
    ///
    /// Unknown ids are ignored.
    pub fn record_failure(&self, id: usize, now: Instant) {
        let mut state = self.state.lock();
        if let Some(key) = state.keys.get_mut(id) {
            key.cooldown_until = Some(now + self.cooldown);
        }
    }

    /// Ids of all currently available keys, clearing expired cooldowns
    pub fn available_keys(&self, now: Instant) -> Vec<usize> {
        self.state.lock().available_indices(now)
    }

    /// Usage counter of a key, if the id is valid
    pub fn usage_count(&self, id: usize) -> Option<u64> {
        self.state.lock().keys.get(id).map(KeyRecord::usage_count)
    }

    /// Cloned snapshot of every key record, in pool order
    pub fn snapshot(&self) -> Vec<KeyRecord> {
        self.state.lock().keys.clone()
    }

    /// Put the key holding this credential into cooldown starting at `now`
    ///
    /// Lookup and cooldown update happen under one lock acquisition, so the
    /// report is atomic with respect to concurrent selections. A credential
    /// that matches no key is a caller bug and is reported as an error.
    pub fn report_failure(&self, credential: &str, now: Instant) -> Result<usize> {
        let mut state = self.state.lock();
        match state
            .keys
            .iter_mut()
            .find(|key| key.credential == credential)
        {
            Some(key) => {
                key.cooldown_until = Some(now + self.cooldown);
                Ok(key.id)
            }
            None => Err(KeywheelError::UnknownCredential),
        }
    }

    /// Run one selection transaction with the given strategy
    ///
    /// Returns the id and credential of the chosen key. The whole scan,
    /// cooldown clearing, cursor movement and usage increment happen under
    /// one lock acquisition.
    pub fn select<R: Rng>(
        &self,
        method: SelectionMethod,
        now: Instant,
        rng: &mut R,
    ) -> Result<(usize, String)> {
        let mut state = self.state.lock();
        let id = match method {
            SelectionMethod::RoundRobin => state.select_round_robin(now),
            SelectionMethod::FailureAware => state.select_failure_aware(now),
            SelectionMethod::WeightedFairness => state.select_weighted(now, rng),
        }?;
        Ok((id, state.keys[id].credential.clone()))
    }

    /// Snapshot of pool health
    pub fn stats(&self, now: Instant) -> PoolStats {
        let state = self.state.lock();
        let total = state.keys.len();
        // Read-only view: expired cooldowns are not cleared here.
        let cooling = state
            .keys
            .iter()
            .filter(|key| matches!(key.cooldown_until, Some(until) if now < until))
            .count();
        let total_selections: u64 = state.keys.iter().map(|key| key.usage_count).sum();

        PoolStats {
            total_keys: total,
            available_keys: total - cooling,
            cooling_keys: cooling,
            total_selections,
        }
    }
}

impl std::fmt::Debug for KeyPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Credentials are intentionally left out of the debug output.
        let state = self.state.lock();
        f.debug_struct("KeyPool")
            .field("keys", &state.keys.len())
            .field("cursor", &state.cursor)
            .field("cooldown", &self.cooldown)
            .finish()
    }
}

/// Statistics about a key pool
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub total_keys: usize,
    pub available_keys: usize,
    pub cooling_keys: usize,
    pub total_selections: u64,
}
