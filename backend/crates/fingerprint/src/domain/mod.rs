//! Domain Layer - Business logic and entities
//!
//! This layer contains:
//! - Domain entities (TrialUsage, DeviceInfo)
//! - Domain value objects (SignalSet, FingerprintId, AlgorithmVersion, CacheEntry)
//! - Domain services (signal derivation and hashing)
//! - Repository traits (device probe, trial usage backend)

pub mod entities;
pub mod repository;
pub mod services;
pub mod value_objects;
