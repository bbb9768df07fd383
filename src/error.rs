//! Keywheel Error Types
//!
//! Error handling for the credential-pool scheduler.

use std::fmt;

/// Main error type for keywheel operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywheelError {
    /// Configuration errors (empty pool, unresolvable env vars, etc.)
    InvalidConfiguration(String),

    /// Every key in the pool is inside its cooldown window
    AllKeysInCooldown,

    /// A failure was reported for a credential that is not in the pool
    UnknownCredential,
}

impl fmt::Display for KeywheelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeywheelError::InvalidConfiguration(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            KeywheelError::AllKeysInCooldown => {
                write!(
                    f,
                    "No keys available: every credential in the pool is cooling down. \
                     Wait for a cooldown to expire or add more keys."
                )
            }
            KeywheelError::UnknownCredential => {
                // The offending value is deliberately not echoed so that
                // credentials never end up in logs or error reports.
                write!(
                    f,
                    "Unknown credential: the reported value does not match any key in the pool"
                )
            }
        }
    }
}

impl std::error::Error for KeywheelError {}

/// Result type alias for keywheel operations
pub type Result<T> = std::result::Result<T, KeywheelError>;
