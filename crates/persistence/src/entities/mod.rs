//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod admin_session;
pub mod document;
pub mod identity_account;

pub use admin_session::AdminSessionEntity;
pub use document::DocumentEntity;
pub use identity_account::IdentityAccountEntity;
