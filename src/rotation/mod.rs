//! Key Rotation
//!
//! Owns the credential pool and the selection strategies that pick keys from it.

pub mod key_pool;
pub mod strategy;

pub use key_pool::{KeyPool, KeyRecord, PoolStats};
pub use strategy::SelectionMethod;
