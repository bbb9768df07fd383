//! Keywheel - Credential-Pool Scheduler
//!
//! Spreads outbound API calls across a fixed pool of interchangeable
//! credentials: exhausted or rate-limited keys are cooled down and skipped,
//! and usage stays statistically balanced across the pool.
//!
//! ```
//! use keywheel::{KeyScheduler, SchedulerConfig};
//!
//! let config = SchedulerConfig::with_keys(vec!["alpha".into(), "beta".into()], 30);
//! let scheduler = KeyScheduler::new(config).unwrap();
//!
//! let credential = scheduler.select_key().unwrap();
//! // ... call the upstream API; when it signals quota exhaustion:
//! scheduler.report_failure(&credential).unwrap();
//! ```

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub mod clock;
pub mod config;
pub mod error;
pub mod rotation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigLoader, SchedulerConfig};
pub use error::{KeywheelError, Result};
pub use rotation::{KeyPool, KeyRecord, PoolStats, SelectionMethod};

/// Public entry point: picks credentials and takes failure reports
///
/// Wraps the [`KeyPool`] with the configured default strategy, a time source
/// and a random source. Both of the latter are injectable for deterministic
/// tests; production code gets the system clock and an entropy-seeded
/// generator.
pub struct KeyScheduler {
    /// Shared credential pool
    pool: KeyPool,

    /// Strategy used by [`select_key`](Self::select_key)
    default_method: SelectionMethod,

    /// Time source for cooldown checks
    clock: Arc<dyn Clock>,

    /// Random source for weighted sampling
    rng: Mutex<StdRng>,
}

impl KeyScheduler {
    /// Build a scheduler from a configuration
    ///
    /// Resolves the credential list (including environment-based sources) and
    /// fails with [`KeywheelError::InvalidConfiguration`] when it comes up
    /// empty or incomplete.
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        let credentials = config.resolve_keys()?;
        let pool = KeyPool::new(credentials, Duration::from_secs(config.cooldown_secs))?;

        Ok(Self {
            pool,
            default_method: config.method,
            clock: Arc::new(SystemClock),
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the random source with a pre-seeded generator
    pub fn with_rng(self, rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            ..self
        }
    }

    /// Pick a credential using the configured default method
    pub fn select_key(&self) -> Result<String> {
        self.select_key_with(self.default_method)
    }

    /// Pick a credential using a specific method
    ///
    /// Fails fast with [`KeywheelError::AllKeysInCooldown`] when every key is
    /// cooling down; the call never waits for a key to become available.
    pub fn select_key_with(&self, method: SelectionMethod) -> Result<String> {
        let now = self.clock.now();
        let mut rng = self.rng.lock();

        match self.pool.select(method, now, &mut *rng) {
            Ok((id, credential)) => {
                debug!(key_id = id, ?method, "selected credential");
                Ok(credential)
            }
            Err(err) => {
                warn!(?method, %err, "selection failed");
                Err(err)
            }
        }
    }

    /// Report that an upstream call with this credential hit a quota or
    /// rate-limit error
    ///
    /// The matching key is put into cooldown. A credential that matches no
    /// key in the pool is a caller bug and yields
    /// [`KeywheelError::UnknownCredential`].
    pub fn report_failure(&self, credential: &str) -> Result<()> {
        let id = self.pool.report_failure(credential, self.clock.now())?;
        warn!(
            key_id = id,
            cooldown_secs = self.pool.cooldown().as_secs(),
            "credential reported exhausted, cooling down"
        );
        Ok(())
    }

    /// Snapshot of pool health
    pub fn stats(&self) -> PoolStats {
        self.pool.stats(self.clock.now())
    }

    /// Access the underlying pool
    pub fn pool(&self) -> &KeyPool {
        &self.pool
    }
}

impl std::fmt::Debug for KeyScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyScheduler")
            .field("pool", &self.pool)
            .field("default_method", &self.default_method)
            .finish()
    }
}
