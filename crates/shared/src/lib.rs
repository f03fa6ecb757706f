//! Shared utilities and common types for the RizAlert backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Cryptographic utilities (hashing, session token generation)
//! - Password hashing with Argon2id
//! - Time-based one-time passwords (RFC 6238)
//! - Lenient timestamp parsing with a single UTC representation
//! - Common validation logic

pub mod crypto;
pub mod password;
pub mod time;
pub mod totp;
pub mod validation;
