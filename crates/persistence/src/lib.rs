//! Persistence layer for the RizAlert admin backend.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Store adapters (records, realtime flags, identity, sessions) with
//!   Postgres, Firebase and in-memory implementations
//! - Repositories that map stored documents onto domain models

pub mod db;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod repositories;
pub mod store;

pub use error::{IdentityError, RealtimeError, RepositoryError, StoreError};
