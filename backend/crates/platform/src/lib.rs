//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (SHA-256, hex digests)
//! - Wall clock abstraction
//! - Key/value storage media (in-memory session storage, JSON file storage)
//! - Environment-based configuration helpers

pub mod clock;
pub mod config;
pub mod crypto;
pub mod storage;
