//! Configuration Module
//!
//! Scheduler configuration schema and file loading.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::SchedulerConfig;
