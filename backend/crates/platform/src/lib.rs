//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (CSPRNG codes, SHA-256, constant-time compare)
//! - One-time secret hashing (Argon2id, salted)
//! - Rolling-window rate limiting and cooldown arithmetic
//! - Client address extraction
//! - Detached background task runner
//! - Clock abstraction

pub mod background;
pub mod client;
pub mod clock;
pub mod crypto;
pub mod rate_limit;
pub mod secret_hash;
