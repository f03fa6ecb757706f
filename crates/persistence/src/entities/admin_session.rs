//! Admin session entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::AdminSession;
use serde_json::Value;
use sqlx::FromRow;

/// Database row mapping for the admin_sessions table.
#[derive(Debug, Clone, FromRow)]
pub struct AdminSessionEntity {
    pub id: String,
    pub data: Value,
    pub expires_at: DateTime<Utc>,
}

impl TryFrom<AdminSessionEntity> for AdminSession {
    type Error = serde_json::Error;

    fn try_from(entity: AdminSessionEntity) -> Result<Self, Self::Error> {
        let mut session: AdminSession = serde_json::from_value(entity.data)?;
        session.id = entity.id;
        session.expires_at = entity.expires_at;
        Ok(session)
    }
}
