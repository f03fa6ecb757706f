//! Identity account entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::store::IdentityAccount;

/// Database row mapping for the identity_accounts table.
#[derive(Debug, Clone, FromRow)]
pub struct IdentityAccountEntity {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<IdentityAccountEntity> for IdentityAccount {
    fn from(entity: IdentityAccountEntity) -> Self {
        Self {
            id: entity.id,
            email: entity.email,
            display_name: entity.display_name,
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_entity_drops_hash() {
        let entity = IdentityAccountEntity {
            id: "uid1".to_string(),
            email: "admin@rizal.gov.ph".to_string(),
            display_name: Some("Admin".to_string()),
            password_hash: "$argon2id$...".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let account: IdentityAccount = entity.clone().into();
        assert_eq!(account.id, entity.id);
        assert_eq!(account.email, entity.email);
        assert_eq!(account.display_name.as_deref(), Some("Admin"));
    }
}
