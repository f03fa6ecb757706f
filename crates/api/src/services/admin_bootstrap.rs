//! Admin bootstrap service for initial setup.
//!
//! Creates the first admin user on startup if configured via environment variables.
//! This is a one-time operation that checks whether the account already exists.

use chrono::Utc;
use domain::models::user::CreateUserRequest;
use domain::models::{UserRole, UserStatus};
use persistence::repositories::UserRepository;
use persistence::{RepositoryError, StoreError};
use tracing::{info, warn};

use crate::config::AdminConfig;

/// Error types for admin bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    #[error("Account creation failed: {0}")]
    Create(#[from] RepositoryError),
}

/// What a bootstrap run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    NotConfigured,
    AlreadyExists,
    Created { user_id: String },
}

/// Bootstrap admin user if configured and not already done.
///
/// Idempotent: if an account with the bootstrap email exists, nothing happens.
pub async fn bootstrap_admin(
    users: &UserRepository,
    config: &AdminConfig,
) -> Result<BootstrapOutcome, BootstrapError> {
    let email = config.bootstrap_email.trim();
    if email.is_empty() {
        return Ok(BootstrapOutcome::NotConfigured);
    }

    if config.bootstrap_password.is_empty() {
        warn!(
            "RA__ADMIN__BOOTSTRAP_EMAIL is set but RA__ADMIN__BOOTSTRAP_PASSWORD is empty - skipping bootstrap"
        );
        return Ok(BootstrapOutcome::NotConfigured);
    }

    if users.find_by_email(email).await?.is_some() {
        info!("Bootstrap email already exists - skipping bootstrap");
        return Ok(BootstrapOutcome::AlreadyExists);
    }

    let username = if config.bootstrap_username.trim().is_empty() {
        email.split('@').next().unwrap_or(email).to_string()
    } else {
        config.bootstrap_username.trim().to_string()
    };

    let request = CreateUserRequest {
        username,
        email: email.to_string(),
        password: config.bootstrap_password.clone(),
        full_name: "System Administrator".to_string(),
        address: None,
        role: Some(UserRole::Admin),
        department: None,
        status: Some(UserStatus::Active),
        municipality: None,
        barangay: None,
    };
    let user = users.create(&request, Utc::now()).await?;

    info!(
        email = %user.email,
        user_id = %user.id,
        "Bootstrap admin user created successfully"
    );
    warn!(
        "SECURITY: Remove RA__ADMIN__BOOTSTRAP_EMAIL and RA__ADMIN__BOOTSTRAP_PASSWORD \
         from configuration after initial setup. Two-factor enrollment is required on first login."
    );

    Ok(BootstrapOutcome::Created { user_id: user.id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::store::{MemoryDocumentStore, MemoryIdentityProvider};
    use std::sync::Arc;

    fn users() -> UserRepository {
        UserRepository::new(
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemoryIdentityProvider::new()),
        )
    }

    fn config(email: &str, password: &str) -> AdminConfig {
        AdminConfig {
            bootstrap_email: email.to_string(),
            bootstrap_username: String::new(),
            bootstrap_password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_skips_when_not_configured() {
        let users = users();
        let outcome = bootstrap_admin(&users, &AdminConfig::default()).await.unwrap();
        assert_eq!(outcome, BootstrapOutcome::NotConfigured);

        let outcome = bootstrap_admin(&users, &config("root@rizal.gov.ph", ""))
            .await
            .unwrap();
        assert_eq!(outcome, BootstrapOutcome::NotConfigured);
        assert_eq!(users.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_creates_admin_once() {
        let users = users();
        let config = config("root@rizal.gov.ph", "changeme123");

        let outcome = bootstrap_admin(&users, &config).await.unwrap();
        let BootstrapOutcome::Created { user_id } = outcome else {
            panic!("expected creation, got {:?}", outcome);
        };
        let user = users.get(&user_id).await.unwrap().unwrap();
        assert!(user.is_admin());
        assert_eq!(user.username, "root");
        assert!(users.verify_password(&user, "changeme123").await.unwrap());

        let again = bootstrap_admin(&users, &config).await.unwrap();
        assert_eq!(again, BootstrapOutcome::AlreadyExists);
        assert_eq!(users.count().await.unwrap(), 1);
    }
}
