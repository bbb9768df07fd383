//! Selection Strategies
//!
//! The three ways a key can be picked from the pool: plain round-robin, a
//! failure-aware circular scan, and weighted-fairness sampling biased toward
//! the least-used keys.

use crate::error::{KeywheelError, Result};
use crate::rotation::key_pool::PoolState;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Guards against division by zero when all candidate counts are equal
const STD_DEV_EPSILON: f64 = 1e-6;

/// Strategy used to pick a key from the pool
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    /// Rotate through keys sequentially
    RoundRobin,

    /// Circular scan for the next key that is not cooling down
    FailureAware,

    /// Random selection weighted toward the least-used keys
    #[default]
    WeightedFairness,
}

impl PoolState {
    /// Advance the cursor by one and take that key
    ///
    /// Falls through to the failure-aware scan when the landed key is inside
    /// its cooldown window, so a disabled key is never handed out.
    pub(crate) fn select_round_robin(&mut self, now: Instant) -> Result<usize> {
        self.cursor = (self.cursor + 1) % self.keys.len();
        let id = self.cursor;

        if !self.keys[id].check_available(now) {
            return self.select_failure_aware(now);
        }

        self.keys[id].usage_count += 1;
        Ok(id)
    }

    /// Scan circularly from the cursor for the first available key
    ///
    /// Expired cooldowns are cleared along the way. After a full circle with
    /// no available key the pool is exhausted.
    pub(crate) fn select_failure_aware(&mut self, now: Instant) -> Result<usize> {
        let n = self.keys.len();
        for _ in 0..n {
            self.cursor = (self.cursor + 1) % n;
            let id = self.cursor;

            if self.keys[id].check_available(now) {
                self.keys[id].usage_count += 1;
                return Ok(id);
            }
        }

        Err(KeywheelError::AllKeysInCooldown)
    }

    /// Sample an available key, biased toward the least-used tier
    ///
    /// Keys at the current maximum usage are excluded from the candidate set
    /// (unless every available key is tied), then each candidate is weighted
    /// by its distance from the candidates' mean usage. Any structural
    /// failure in the weighting step falls back to the failure-aware scan.
    /// The shared cursor is left untouched.
    pub(crate) fn select_weighted<R: Rng>(&mut self, now: Instant, rng: &mut R) -> Result<usize> {
        let available = self.available_indices(now);
        if available.is_empty() {
            return self.select_failure_aware(now);
        }

        let max_usage = match available.iter().map(|&i| self.keys[i].usage_count).max() {
            Some(max) => max,
            None => return self.select_failure_aware(now),
        };

        let mut candidates: Vec<usize> = available
            .iter()
            .copied()
            .filter(|&i| self.keys[i].usage_count < max_usage)
            .collect();
        if candidates.is_empty() {
            // All available keys are tied.
            candidates = available;
        }

        let counts: Vec<f64> = candidates
            .iter()
            .map(|&i| self.keys[i].usage_count as f64)
            .collect();
        let mean = counts.iter().sum::<f64>() / counts.len() as f64;
        let variance =
            counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / counts.len() as f64;
        let std_dev = variance.sqrt() + STD_DEV_EPSILON;

        let weights: Vec<f64> = counts
            .iter()
            .map(|c| 1.0 / (1.0 + (c - mean).abs() / std_dev))
            .collect();

        let distribution = match WeightedIndex::new(&weights) {
            Ok(distribution) => distribution,
            Err(_) => return self.select_failure_aware(now),
        };

        let id = candidates[distribution.sample(rng)];
        self.keys[id].usage_count += 1;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::KeyPool;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn pool_of(n: usize, cooldown_secs: u64) -> KeyPool {
        let creds = (0..n).map(|i| format!("key-{}", i)).collect();
        KeyPool::new(creds, Duration::from_secs(cooldown_secs)).unwrap()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_round_robin_cycles_in_index_order() {
        let pool = pool_of(4, 10);
        let mut rng = rng();
        let now = Instant::now();

        let picked: Vec<usize> = (0..8)
            .map(|_| {
                pool.select(SelectionMethod::RoundRobin, now, &mut rng)
                    .unwrap()
                    .0
            })
            .collect();

        assert_eq!(picked, vec![0, 1, 2, 3, 0, 1, 2, 3]);
    }

    #[test]
    fn test_round_robin_single_key_pool() {
        let pool = pool_of(1, 10);
        let mut rng = rng();
        let now = Instant::now();

        for _ in 0..3 {
            let (id, credential) = pool
                .select(SelectionMethod::RoundRobin, now, &mut rng)
                .unwrap();
            assert_eq!(id, 0);
            assert_eq!(credential, "key-0");
        }
    }

    #[test]
    fn test_round_robin_skips_cooling_key() {
        let pool = pool_of(3, 10);
        let mut rng = rng();
        let t0 = Instant::now();

        pool.record_failure(1, t0);

        for _ in 0..6 {
            let (id, _) = pool
                .select(SelectionMethod::RoundRobin, t0 + Duration::from_secs(1), &mut rng)
                .unwrap();
            assert_ne!(id, 1);
        }
    }

    #[test]
    fn test_round_robin_counts_usage() {
        let pool = pool_of(2, 10);
        let mut rng = rng();
        let now = Instant::now();

        for _ in 0..4 {
            pool.select(SelectionMethod::RoundRobin, now, &mut rng)
                .unwrap();
        }

        assert_eq!(pool.usage_count(0), Some(2));
        assert_eq!(pool.usage_count(1), Some(2));
    }

    #[test]
    fn test_failure_aware_returns_first_available() {
        let pool = pool_of(3, 10);
        let mut rng = rng();
        let t0 = Instant::now();

        pool.record_failure(0, t0);
        pool.record_failure(1, t0);

        let (id, _) = pool
            .select(SelectionMethod::FailureAware, t0 + Duration::from_secs(1), &mut rng)
            .unwrap();
        assert_eq!(id, 2);
    }

    #[test]
    fn test_failure_aware_exhausted_pool() {
        let pool = pool_of(2, 10);
        let mut rng = rng();
        let t0 = Instant::now();

        pool.record_failure(0, t0);
        pool.record_failure(1, t0);

        let err = pool
            .select(SelectionMethod::FailureAware, t0 + Duration::from_secs(1), &mut rng)
            .unwrap_err();
        assert_eq!(err, KeywheelError::AllKeysInCooldown);
    }

    #[test]
    fn test_failure_aware_recovers_after_expiry() {
        let pool = pool_of(2, 10);
        let mut rng = rng();
        let t0 = Instant::now();

        pool.record_failure(0, t0);
        pool.record_failure(1, t0);

        let (id, _) = pool
            .select(SelectionMethod::FailureAware, t0 + Duration::from_secs(10), &mut rng)
            .unwrap();
        assert_eq!(id, 0);
    }

    #[test]
    fn test_weighted_near_uniform_when_tied() {
        let pool = pool_of(3, 10);
        let mut rng = rng();
        let now = Instant::now();

        let mut counts = [0u32; 3];
        for _ in 0..3000 {
            let (id, _) = pool
                .select(SelectionMethod::WeightedFairness, now, &mut rng)
                .unwrap();
            counts[id] += 1;
        }

        // Usage feedback keeps the distribution close to uniform.
        for &count in &counts {
            assert!(
                (800..=1200).contains(&count),
                "expected near-uniform counts, got {:?}",
                counts
            );
        }
    }

    #[test]
    fn test_weighted_avoids_heavily_used_key() {
        let pool = pool_of(3, 10);
        let mut rng = rng();
        let now = Instant::now();

        for _ in 0..10 {
            pool.record_use(0);
        }

        let mut counts = [0u32; 3];
        for _ in 0..30 {
            let (id, _) = pool
                .select(SelectionMethod::WeightedFairness, now, &mut rng)
                .unwrap();
            counts[id] += 1;
        }

        assert!(counts[0] < counts[1], "counts: {:?}", counts);
        assert!(counts[0] < counts[2], "counts: {:?}", counts);
    }

    #[test]
    fn test_weighted_never_returns_cooling_key() {
        let pool = pool_of(3, 10);
        let mut rng = rng();
        let t0 = Instant::now();

        pool.record_failure(1, t0);

        for _ in 0..50 {
            let (id, _) = pool
                .select(SelectionMethod::WeightedFairness, t0 + Duration::from_secs(1), &mut rng)
                .unwrap();
            assert_ne!(id, 1);
        }
    }

    #[test]
    fn test_weighted_exhausted_pool_falls_back() {
        let pool = pool_of(2, 10);
        let mut rng = rng();
        let t0 = Instant::now();

        pool.record_failure(0, t0);
        pool.record_failure(1, t0);

        let err = pool
            .select(SelectionMethod::WeightedFairness, t0 + Duration::from_secs(1), &mut rng)
            .unwrap_err();
        assert_eq!(err, KeywheelError::AllKeysInCooldown);
    }

    #[test]
    fn test_weighted_leaves_cursor_untouched() {
        let pool = pool_of(3, 10);
        let mut rng = rng();
        let now = Instant::now();

        pool.select(SelectionMethod::WeightedFairness, now, &mut rng)
            .unwrap();

        // Round-robin still starts its rotation at key 0.
        let (id, _) = pool
            .select(SelectionMethod::RoundRobin, now, &mut rng)
            .unwrap();
        assert_eq!(id, 0);
    }

    #[test]
    fn test_seeded_rng_gives_repeatable_sequences() {
        let now = Instant::now();

        let run = || {
            let pool = pool_of(3, 10);
            let mut rng = StdRng::seed_from_u64(7);
            (0..20)
                .map(|_| {
                    pool.select(SelectionMethod::WeightedFairness, now, &mut rng)
                        .unwrap()
                        .0
                })
                .collect::<Vec<_>>()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_method_deserializes_from_snake_case() {
        let method: SelectionMethod = serde_json::from_str("\"round_robin\"").unwrap();
        assert_eq!(method, SelectionMethod::RoundRobin);

        let method: SelectionMethod = serde_json::from_str("\"failure_aware\"").unwrap();
        assert_eq!(method, SelectionMethod::FailureAware);

        let method: SelectionMethod = serde_json::from_str("\"weighted_fairness\"").unwrap();
        assert_eq!(method, SelectionMethod::WeightedFairness);

        assert_eq!(SelectionMethod::default(), SelectionMethod::WeightedFairness);
    }
}
