//! Repositories mapping stored documents onto domain models.

pub mod alerts;
pub mod configuration;
pub mod emergencies;
pub mod sirens;
pub mod users;

pub use alerts::AlertRepository;
pub use configuration::ConfigurationRepository;
pub use emergencies::EmergencyRepository;
pub use sirens::SirenRepository;
pub use users::UserRepository;

use chrono::{DateTime, Utc};
use domain::services::views::sort_newest_first;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;
use crate::store::{Document, Fields};

/// Decodes documents, skipping (and logging) any that do not fit the model.
pub(crate) fn decode_all<T: DeserializeOwned>(collection: &str, docs: Vec<Document>) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| decode_one(collection, doc))
        .collect()
}

pub(crate) fn decode_one<T: DeserializeOwned>(collection: &str, doc: Document) -> Option<T> {
    let id = doc.id.clone();
    match doc.decode() {
        Ok(model) => Some(model),
        Err(e) => {
            tracing::warn!(collection, document_id = %id, error = %e, "Skipping malformed document");
            None
        }
    }
}

/// Keeps the `limit` newest records by their parsed UTC timestamp; undated last.
///
/// Stored timestamps come in several formats, so ordering happens after decoding.
pub(crate) fn newest<T, F>(mut records: Vec<T>, created: F, limit: usize) -> Vec<T>
where
    F: Fn(&T) -> Option<DateTime<Utc>>,
{
    sort_newest_first(&mut records, created);
    records.truncate(limit);
    records
}

/// Serializes a model into a document body, dropping its `id`.
pub(crate) fn to_fields<T: Serialize>(model: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(model)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(StoreError::Serialization(serde::ser::Error::custom(format!(
            "expected an object, got {other}"
        )))),
    }
}

/// Inserts `value` under `key` when present.
pub(crate) fn set_opt<V: Into<Value>>(fields: &mut Fields, key: &str, value: Option<V>) {
    if let Some(value) = value {
        fields.insert(key.to_string(), value.into());
    }
}
