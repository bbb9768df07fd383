//! Scheduler Configuration
//!
//! Defines the configuration schema: where credentials come from, how long a
//! failed key cools down, and which selection method is the default.

use crate::error::{KeywheelError, Result};
use crate::rotation::SelectionMethod;
use serde::{Deserialize, Serialize};

fn default_cooldown_secs() -> u64 {
    60
}

/// Configuration for a [`KeyScheduler`](crate::KeyScheduler)
///
/// Credentials can be given directly (`keys`), as environment variable names
/// (`keys_env`), or as a numbered prefix scheme (`key_env_prefix` plus
/// `key_count`, resolving `PREFIX_1` through `PREFIX_{count}`). All three
/// sources are combined, in that order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Raw credential values
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,

    /// Environment variable names holding one credential each
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys_env: Vec<String>,

    /// Prefix for numbered credential variables (`PREFIX_1`, `PREFIX_2`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_env_prefix: Option<String>,

    /// How many numbered variables to resolve; every one must be set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_count: Option<usize>,

    /// Cooldown window applied to a key after a reported failure, in seconds
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Selection method used when the caller does not name one
    #[serde(default)]
    pub method: SelectionMethod,
}

impl SchedulerConfig {
    /// Config with an explicit credential list
    pub fn with_keys(keys: Vec<String>, cooldown_secs: u64) -> Self {
        Self {
            keys,
            keys_env: Vec::new(),
            key_env_prefix: None,
            key_count: None,
            cooldown_secs,
            method: SelectionMethod::default(),
        }
    }

    /// Config resolving `{prefix}_1 ..= {prefix}_{count}` from the environment
    pub fn with_env_prefix(prefix: impl Into<String>, count: usize, cooldown_secs: u64) -> Self {
        Self {
            keys: Vec::new(),
            keys_env: Vec::new(),
            key_env_prefix: Some(prefix.into()),
            key_count: Some(count),
            cooldown_secs,
            method: SelectionMethod::default(),
        }
    }

    /// Set the default selection method
    pub fn method(mut self, method: SelectionMethod) -> Self {
        self.method = method;
        self
    }

    /// Resolve the final ordered credential list
    ///
    /// Fails when a named or numbered environment variable is missing, or
    /// when no credential resolves at all.
    pub fn resolve_keys(&self) -> Result<Vec<String>> {
        let mut resolved = self.keys.clone();

        for env_var in &self.keys_env {
            match std::env::var(env_var) {
                Ok(key) => resolved.push(key),
                Err(_) => {
                    return Err(KeywheelError::InvalidConfiguration(format!(
                        "environment variable '{}' is not set",
                        env_var
                    )));
                }
            }
        }

        if let Some(prefix) = &self.key_env_prefix {
            let count = self.key_count.unwrap_or(0);
            if count == 0 {
                return Err(KeywheelError::InvalidConfiguration(
                    "key_env_prefix requires a key_count of at least 1".to_string(),
                ));
            }

            for i in 1..=count {
                let env_var = format!("{}_{}", prefix, i);
                match std::env::var(&env_var) {
                    Ok(key) => resolved.push(key),
                    Err(_) => {
                        return Err(KeywheelError::InvalidConfiguration(format!(
                            "expected {} credentials but '{}' is not set",
                            count, env_var
                        )));
                    }
                }
            }
        }

        if resolved.is_empty() {
            return Err(KeywheelError::InvalidConfiguration(
                "no credentials configured: set keys, keys_env or key_env_prefix".to_string(),
            ));
        }

        Ok(resolved)
    }
}
