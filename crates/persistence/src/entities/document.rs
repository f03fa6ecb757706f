//! Document entity (database row mapping).

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;

use crate::store::{Document, Fields};

/// Database row mapping for the documents table.
#[derive(Debug, Clone, FromRow)]
pub struct DocumentEntity {
    pub collection: String,
    pub id: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DocumentEntity> for Document {
    fn from(entity: DocumentEntity) -> Self {
        let fields = match entity.data {
            Value::Object(map) => map,
            _ => Fields::new(),
        };
        Document::new(entity.id, fields)
    }
}
