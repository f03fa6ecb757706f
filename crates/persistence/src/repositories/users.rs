//! User repository.
//!
//! User documents live in the `users` collection keyed by the id of their
//! identity account. Writes touching login details are mirrored to the
//! identity adapter.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::models::user::{CreateUserRequest, UpdateUserRequest};
use domain::models::{User, UserRole, UserStatus};
use serde_json::{json, Value};
use shared::time::format_timestamp;
use tracing::{error, info, warn};

use super::{decode_all, decode_one, set_opt};
use crate::error::{IdentityError, RepositoryError, StoreError};
use crate::store::{AccountUpdate, DocumentStore, Fields, IdentityProvider, QueryOp};

pub const USERS: &str = "users";

/// Municipality assigned to users created without one.
pub const DEFAULT_MUNICIPALITY: &str = "Rizal";

/// Repository for user documents and their identity accounts.
#[derive(Clone)]
pub struct UserRepository {
    docs: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl UserRepository {
    pub fn new(docs: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { docs, identity }
    }

    pub async fn list(&self) -> Result<Vec<User>, StoreError> {
        let docs = self.docs.get_all(USERS).await?;
        Ok(decode_all(USERS, docs))
    }

    pub async fn get(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .docs
            .get_by_id(USERS, id)
            .await?
            .and_then(|doc| decode_one(USERS, doc)))
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.docs.get_all(USERS).await?.len())
    }

    async fn find_one(&self, field: &str, value: &str) -> Result<Option<User>, StoreError> {
        let docs = self
            .docs
            .query(USERS, field, QueryOp::Eq, &Value::String(value.to_string()))
            .await?;
        Ok(decode_all::<User>(USERS, docs).into_iter().next())
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.find_one("username", username.trim()).await
    }

    /// Exact match first, then a case-insensitive match for older records.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.trim();
        if let Some(user) = self.find_one("email", email).await? {
            return Ok(Some(user));
        }
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email)))
    }

    /// Resolves a login identifier (email or username) to a user.
    pub async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        if identifier.contains('@') {
            self.find_by_email(identifier).await
        } else {
            self.find_by_username(identifier).await
        }
    }

    /// Checks a password against the user's identity account.
    ///
    /// The account is located by email so records whose id predates the
    /// identity store still authenticate.
    pub async fn verify_password(&self, user: &User, password: &str) -> Result<bool, IdentityError> {
        let account = match self.identity.get_account(&user.id).await {
            Ok(account) => account,
            Err(IdentityError::NotFound(_)) => self.identity.lookup_by_email(&user.email).await?,
            Err(e) => return Err(e),
        };
        self.identity.verify_password(&account.id, password).await
    }

    /// Creates the identity account, then the user document under the same id.
    ///
    /// If the document cannot be written the identity account is deleted again.
    pub async fn create(
        &self,
        request: &CreateUserRequest,
        now: DateTime<Utc>,
    ) -> Result<User, RepositoryError> {
        let display_name = Some(request.full_name.as_str()).filter(|n| !n.is_empty());
        let id = self
            .identity
            .create_account(&request.email, &request.password, display_name)
            .await?;

        let mut fields = Fields::new();
        fields.insert("username".into(), json!(request.username));
        fields.insert("email".into(), json!(request.email));
        fields.insert("fullName".into(), json!(request.full_name));
        fields.insert("address".into(), json!(request.address));
        fields.insert(
            "role".into(),
            json!(request.role.unwrap_or(UserRole::Admin).as_str()),
        );
        fields.insert("department".into(), json!(request.department));
        fields.insert(
            "status".into(),
            json!(request.status.unwrap_or(UserStatus::Active).as_str()),
        );
        fields.insert(
            "municipality".into(),
            json!(request
                .municipality
                .clone()
                .unwrap_or_else(|| DEFAULT_MUNICIPALITY.to_string())),
        );
        fields.insert("barangay".into(), json!(request.barangay));
        fields.insert("profile_image".into(), Value::Null);
        fields.insert("two_factor_enabled".into(), json!(false));
        fields.insert("createdAt".into(), json!(format_timestamp(now)));

        if let Err(e) = self.docs.create(USERS, fields, Some(&id)).await {
            error!(user_id = %id, error = %e, "User document write failed; removing identity account");
            if let Err(cleanup) = self.identity.delete_account(&id).await {
                error!(user_id = %id, error = %cleanup, "Failed to remove orphaned identity account");
            }
            return Err(e.into());
        }

        info!(user_id = %id, username = %request.username, "User created");
        self.get(&id)
            .await?
            .ok_or_else(|| StoreError::not_found(USERS, &id).into())
    }

    /// Applies a partial update. Returns `None` when the user does not exist.
    ///
    /// Email, full name and password changes go to the identity account as
    /// well; a failure there is logged and the document update still happens.
    pub async fn update(
        &self,
        id: &str,
        request: &UpdateUserRequest,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        if self.get(id).await?.is_none() {
            return Ok(None);
        }

        let account_update = AccountUpdate {
            email: request.email.clone(),
            password: request.password.clone(),
            display_name: request.full_name.clone(),
        };
        if !account_update.is_empty() {
            if let Err(e) = self.identity.update_account(id, account_update).await {
                warn!(user_id = %id, error = %e, "Could not mirror user update to identity account");
            }
        }

        let mut patch = Fields::new();
        set_opt(&mut patch, "username", request.username.clone());
        set_opt(&mut patch, "email", request.email.clone());
        set_opt(&mut patch, "address", request.address.clone());
        set_opt(&mut patch, "fullName", request.full_name.clone());
        set_opt(&mut patch, "profile_image", request.profile_image.clone());
        set_opt(&mut patch, "role", request.role.map(|r| r.as_str()));
        set_opt(&mut patch, "department", request.department.clone());
        set_opt(&mut patch, "status", request.status.map(|s| s.as_str()));
        set_opt(&mut patch, "barangay", request.barangay.clone());
        set_opt(&mut patch, "municipality", request.municipality.clone());
        patch.insert("updatedAt".into(), json!(format_timestamp(now)));

        self.docs.update(USERS, id, patch).await?;
        info!(user_id = %id, "User updated");
        Ok(self.get(id).await?)
    }

    /// Deletes the identity account (failures logged) and then the document.
    ///
    /// Returns the deleted user, or `None` if there was no such document.
    pub async fn delete(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        let Some(user) = self.get(id).await? else {
            return Ok(None);
        };

        if let Err(e) = self.identity.delete_account(id).await {
            warn!(user_id = %id, error = %e, "Could not delete identity account");
        }
        self.docs.delete(USERS, id).await?;
        info!(user_id = %id, username = %user.username, "User deleted");
        Ok(Some(user))
    }

    /// Merges raw fields into a user document.
    pub async fn patch(&self, id: &str, fields: Fields) -> Result<(), StoreError> {
        self.docs.update(USERS, id, fields).await
    }

    pub async fn record_login(&self, id: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut fields = Fields::new();
        fields.insert("lastLogin".into(), json!(format_timestamp(now)));
        self.patch(id, fields).await
    }

    /// Stores a confirmed TOTP secret and enables two-factor login.
    pub async fn enable_two_factor(
        &self,
        id: &str,
        secret: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut fields = Fields::new();
        fields.insert("two_factor_secret".into(), json!(secret));
        fields.insert("two_factor_enabled".into(), json!(true));
        fields.insert("two_factor_setup_date".into(), json!(format_timestamp(now)));
        self.patch(id, fields).await?;
        info!(user_id = %id, "Two-factor authentication enabled");
        Ok(())
    }

    pub async fn disable_two_factor(&self, id: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut fields = Fields::new();
        fields.insert("two_factor_secret".into(), Value::Null);
        fields.insert("two_factor_enabled".into(), json!(false));
        fields.insert(
            "two_factor_disabled_date".into(),
            json!(format_timestamp(now)),
        );
        self.patch(id, fields).await?;
        info!(user_id = %id, "Two-factor authentication disabled");
        Ok(())
    }

    /// Verifies `current` and sets `new_password` on the identity account.
    ///
    /// Returns false when the current password is wrong.
    pub async fn change_password(
        &self,
        user: &User,
        current: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        if !self.verify_password(user, current).await? {
            warn!(user_id = %user.id, "Password change rejected: current password mismatch");
            return Ok(false);
        }

        self.identity
            .update_account(
                &user.id,
                AccountUpdate {
                    password: Some(new_password.to_string()),
                    ..Default::default()
                },
            )
            .await?;

        let stamp = json!(format_timestamp(now));
        let mut fields = Fields::new();
        fields.insert("passwordChangedAt".into(), stamp.clone());
        fields.insert("updatedAt".into(), stamp);
        self.patch(&user.id, fields).await?;
        info!(user_id = %user.id, "Password changed");
        Ok(true)
    }

    /// Changes the login email on the identity account; failures are logged.
    pub async fn mirror_email(&self, id: &str, email: &str) {
        let update = AccountUpdate {
            email: Some(email.to_string()),
            ..Default::default()
        };
        if let Err(e) = self.identity.update_account(id, update).await {
            warn!(user_id = %id, error = %e, "Could not update identity email");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryDocumentStore, MemoryIdentityProvider};
    use async_trait::async_trait;
    use crate::store::Document;
    use fake::faker::internet::en::{SafeEmail, Username};
    use fake::faker::name::en::Name;
    use fake::Fake;

    fn repo() -> (UserRepository, Arc<MemoryIdentityProvider>) {
        let identity = Arc::new(MemoryIdentityProvider::new());
        let repo = UserRepository::new(Arc::new(MemoryDocumentStore::new()), identity.clone());
        (repo, identity)
    }

    fn request() -> CreateUserRequest {
        CreateUserRequest {
            username: Username().fake(),
            email: SafeEmail().fake(),
            password: "secret123".to_string(),
            full_name: Name().fake(),
            address: None,
            role: None,
            department: None,
            status: None,
            municipality: None,
            barangay: Some("Pitogo".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let (repo, identity) = repo();
        let req = request();
        let user = repo.create(&req, Utc::now()).await.unwrap();

        assert_eq!(user.username, req.username);
        assert_eq!(user.role, Some(UserRole::Admin));
        assert_eq!(user.status, Some(UserStatus::Active));
        assert_eq!(user.municipality.as_deref(), Some(DEFAULT_MUNICIPALITY));
        assert!(!user.two_factor_enabled);

        let account = identity.get_account(&user.id).await.unwrap();
        assert_eq!(account.email, req.email.to_lowercase());
        assert!(repo.verify_password(&user, "secret123").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_duplicate_email_fails_without_document() {
        let (repo, _) = repo();
        let req = request();
        repo.create(&req, Utc::now()).await.unwrap();

        let err = repo.create(&req, Utc::now()).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Identity(IdentityError::EmailExists(_))
        ));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    struct FailingDocs;

    #[async_trait]
    impl DocumentStore for FailingDocs {
        async fn get_by_id(&self, _: &str, _: &str) -> Result<Option<Document>, StoreError> {
            Ok(None)
        }
        async fn get_all(&self, _: &str) -> Result<Vec<Document>, StoreError> {
            Ok(vec![])
        }
        async fn query(
            &self,
            _: &str,
            _: &str,
            _: QueryOp,
            _: &Value,
        ) -> Result<Vec<Document>, StoreError> {
            Ok(vec![])
        }
        async fn create(&self, c: &str, _: Fields, id: Option<&str>) -> Result<String, StoreError> {
            Err(StoreError::not_found(c, id.unwrap_or_default()))
        }
        async fn update(&self, c: &str, id: &str, _: Fields) -> Result<(), StoreError> {
            Err(StoreError::not_found(c, id))
        }
        async fn delete(&self, _: &str, _: &str) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_create_compensates_identity_on_document_failure() {
        let identity = Arc::new(MemoryIdentityProvider::new());
        let repo = UserRepository::new(Arc::new(FailingDocs), identity.clone());
        let req = request();

        let err = repo.create(&req, Utc::now()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Store(_)));
        assert!(matches!(
            identity.lookup_by_email(&req.email).await,
            Err(IdentityError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_mirrors_login_fields() {
        let (repo, identity) = repo();
        let user = repo.create(&request(), Utc::now()).await.unwrap();

        let update = UpdateUserRequest {
            email: Some("new@rizal.gov.ph".to_string()),
            password: Some("another1".to_string()),
            status: Some(UserStatus::Inactive),
            ..Default::default()
        };
        let updated = repo
            .update(&user.id, &update, Utc::now())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.email, "new@rizal.gov.ph");
        assert_eq!(updated.status, Some(UserStatus::Inactive));
        assert_eq!(updated.username, user.username);
        assert_eq!(
            identity.get_account(&user.id).await.unwrap().email,
            "new@rizal.gov.ph"
        );
        assert!(repo.verify_password(&updated, "another1").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_unknown_user() {
        let (repo, _) = repo();
        let result = repo
            .update("missing", &UpdateUserRequest::default(), Utc::now())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_both_sides() {
        let (repo, identity) = repo();
        let user = repo.create(&request(), Utc::now()).await.unwrap();

        let deleted = repo.delete(&user.id).await.unwrap().unwrap();
        assert_eq!(deleted.id, user.id);
        assert!(repo.get(&user.id).await.unwrap().is_none());
        assert!(identity.get_account(&user.id).await.is_err());
        assert!(repo.delete(&user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_login() {
        let (repo, _) = repo();
        let req = request();
        let user = repo.create(&req, Utc::now()).await.unwrap();

        let by_name = repo.find_by_login(&req.username).await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);

        let by_email = repo
            .find_by_login(&req.email.to_uppercase())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user.id);

        assert!(repo.find_by_login("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_two_factor_toggle() {
        let (repo, _) = repo();
        let user = repo.create(&request(), Utc::now()).await.unwrap();

        repo.enable_two_factor(&user.id, "JBSWY3DPEHPK3PXP", Utc::now())
            .await
            .unwrap();
        let enabled = repo.get(&user.id).await.unwrap().unwrap();
        assert!(enabled.two_factor_enabled);
        assert_eq!(enabled.totp_secret(), Some("JBSWY3DPEHPK3PXP"));

        repo.disable_two_factor(&user.id, Utc::now()).await.unwrap();
        let disabled = repo.get(&user.id).await.unwrap().unwrap();
        assert!(!disabled.two_factor_enabled);
        assert_eq!(disabled.totp_secret(), None);
    }

    #[tokio::test]
    async fn test_change_password() {
        let (repo, _) = repo();
        let user = repo.create(&request(), Utc::now()).await.unwrap();

        assert!(!repo
            .change_password(&user, "wrong", "newpass1", Utc::now())
            .await
            .unwrap());
        assert!(repo
            .change_password(&user, "secret123", "newpass1", Utc::now())
            .await
            .unwrap());
        assert!(repo.verify_password(&user, "newpass1").await.unwrap());
    }

    #[tokio::test]
    async fn test_record_login() {
        let (repo, _) = repo();
        let user = repo.create(&request(), Utc::now()).await.unwrap();
        let now = Utc::now();
        repo.record_login(&user.id, now).await.unwrap();

        let reloaded = repo.get(&user.id).await.unwrap().unwrap();
        assert_eq!(
            reloaded.last_login.map(|t| t.timestamp_micros()),
            Some(now.timestamp_micros())
        );
    }
}
