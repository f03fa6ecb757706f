//! Error types for the store adapters and repositories.

use shared::password::PasswordError;
use thiserror::Error;

/// Record store and session store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("Invalid field path: {0}")]
    InvalidField(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

/// Realtime flag store failures.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Realtime database returned {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Identity adapter failures.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("No account found for {0}")]
    NotFound(String),

    #[error("An account already exists for {0}")]
    EmailExists(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors from repositories that coordinate more than one adapter.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Realtime(#[from] RealtimeError),
}
