//! Infrastructure layer: job queues, cache, persistence ports, config.

pub mod cache;
pub mod config;
pub mod jobs;
pub mod persistence;
pub mod tasks;

pub use config::InfraConfig;
