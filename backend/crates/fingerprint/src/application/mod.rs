//! Application Layer - Use Cases
//!
//! This layer orchestrates domain logic and infrastructure.
//! Contains use case implementations.

pub mod cache;
pub mod collector;
pub mod config;
pub mod generate;
pub mod incognito;
pub mod trial_usage;
