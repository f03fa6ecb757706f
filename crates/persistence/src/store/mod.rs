//! Store adapters.
//!
//! Four seams separate the admin backend from its storage:
//! - [`DocumentStore`]: schemaless documents grouped in collections
//! - [`RealtimeStore`]: small JSON values addressed by path (siren flags)
//! - [`IdentityProvider`]: login accounts and password checks
//! - [`SessionStore`]: server-side admin sessions
//!
//! Each has a Postgres implementation and an in-memory one; the realtime
//! store can also talk to a Firebase Realtime Database over REST.

pub mod firebase;
pub mod memory;
pub mod postgres;

use std::cmp::Ordering;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use domain::models::AdminSession;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{IdentityError, RealtimeError, StoreError};

pub use firebase::FirebaseRealtimeStore;
pub use memory::{MemoryDocumentStore, MemoryIdentityProvider, MemoryRealtimeStore, MemorySessionStore};
pub use postgres::{PgDocumentStore, PgIdentityProvider, PgRealtimeStore, PgSessionStore};

/// Document body: a JSON object without its id.
pub type Fields = Map<String, Value>;

/// Random bytes behind a generated document id (20 URL-safe characters).
const DOCUMENT_ID_BYTES: usize = 15;

/// Generates an opaque document id.
pub fn generate_document_id() -> String {
    let mut bytes = [0u8; DOCUMENT_ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// The fields with the document id injected under `id`.
    pub fn into_value(self) -> Value {
        let mut fields = self.fields;
        fields.insert("id".to_string(), Value::String(self.id));
        Value::Object(fields)
    }

    /// Deserializes the document (id included) into a model.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.into_value())
    }
}

/// Comparison used by [`DocumentStore::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// The field is an array containing the value.
    ArrayContains,
}

impl QueryOp {
    /// Evaluates the operator against a field value, `None` meaning the field is absent.
    pub fn matches(self, field: Option<&Value>, value: &Value) -> bool {
        let Some(field) = field else {
            return false;
        };
        match self {
            QueryOp::Eq => json_eq(field, value),
            QueryOp::Ne => !json_eq(field, value),
            QueryOp::ArrayContains => field
                .as_array()
                .map(|items| items.iter().any(|item| json_eq(item, value)))
                .unwrap_or(false),
            QueryOp::Lt => compare_values(field, value) == Some(Ordering::Less),
            QueryOp::Le => matches!(
                compare_values(field, value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            QueryOp::Gt => compare_values(field, value) == Some(Ordering::Greater),
            QueryOp::Ge => matches!(
                compare_values(field, value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }
}

/// Splits a dotted field path (`a.b.c`), rejecting empty segments.
pub fn field_path(field: &str) -> Result<Vec<&str>, StoreError> {
    let segments: Vec<&str> = field.split('.').collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(StoreError::InvalidField(field.to_string()));
    }
    Ok(segments)
}

/// Looks up a dotted path inside a document body.
pub fn lookup<'a>(fields: &'a Fields, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = fields.get(*first)?;
    for segment in rest {
        current = current.as_object()?.get(*segment)?;
    }
    Some(current)
}

fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Orders two values of the same JSON type. Mixed types are incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Schemaless document storage.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Every document of a collection, in insertion order.
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Documents whose `field` satisfies `op` against `value`.
    ///
    /// Documents missing the field never match.
    async fn query(
        &self,
        collection: &str,
        field: &str,
        op: QueryOp,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError>;

    /// Stores a document and returns its id.
    ///
    /// With an explicit id an existing document is replaced.
    async fn create(
        &self,
        collection: &str,
        fields: Fields,
        id: Option<&str>,
    ) -> Result<String, StoreError>;

    /// Merges `patch` into the top level of an existing document.
    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), StoreError>;

    /// Returns false when nothing was deleted.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// Cheap reachability check for readiness probes.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Path-addressed JSON values.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Value>, RealtimeError>;
    async fn set(&self, path: &str, value: Value) -> Result<(), RealtimeError>;
}

/// Leading and trailing slashes are not significant in realtime paths.
pub fn normalize_path(path: &str) -> &str {
    path.trim_matches('/')
}

/// A login account as seen by the admin backend.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityAccount {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields to change on an identity account. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub display_name: Option<String>,
}

impl AccountUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none() && self.display_name.is_none()
    }
}

/// Login accounts. Emails are matched case-insensitively.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates an account and returns its id.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<String, IdentityError>;

    async fn lookup_by_email(&self, email: &str) -> Result<IdentityAccount, IdentityError>;

    async fn get_account(&self, id: &str) -> Result<IdentityAccount, IdentityError>;

    async fn update_account(&self, id: &str, update: AccountUpdate) -> Result<(), IdentityError>;

    async fn delete_account(&self, id: &str) -> Result<(), IdentityError>;

    /// `Ok(false)` for a wrong password; `NotFound` for an unknown account.
    async fn verify_password(&self, id: &str, password: &str) -> Result<bool, IdentityError>;
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Server-side admin sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads a live session. Expired sessions read as absent.
    async fn load(&self, id: &str, now: DateTime<Utc>) -> Result<Option<AdminSession>, StoreError>;

    async fn save(&self, session: &AdminSession) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Removes expired sessions and returns how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_generate_document_id_shape() {
        let id = generate_document_id();
        assert_eq!(id.len(), 20);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(id, generate_document_id());
    }

    #[test]
    fn test_document_decode_injects_id() {
        #[derive(serde::Deserialize)]
        struct Named {
            id: String,
            name: String,
        }

        let doc = Document::new("abc", fields(json!({"name": "Rizal"})));
        let named: Named = doc.decode().unwrap();
        assert_eq!(named.id, "abc");
        assert_eq!(named.name, "Rizal");
    }

    #[test]
    fn test_field_path() {
        assert_eq!(field_path("a.b").unwrap(), vec!["a", "b"]);
        assert!(matches!(field_path("a..b"), Err(StoreError::InvalidField(_))));
        assert!(field_path("").is_err());
    }

    #[test]
    fn test_lookup_nested() {
        let body = fields(json!({"a": {"b": 3}, "c": 1}));
        assert_eq!(lookup(&body, &["a", "b"]), Some(&json!(3)));
        assert_eq!(lookup(&body, &["c", "b"]), None);
        assert_eq!(lookup(&body, &["missing"]), None);
    }

    #[test]
    fn test_query_op_matches() {
        assert!(QueryOp::Eq.matches(Some(&json!(1)), &json!(1.0)));
        assert!(QueryOp::Ne.matches(Some(&json!("a")), &json!("b")));
        assert!(!QueryOp::Ne.matches(None, &json!("b")));
        assert!(QueryOp::Lt.matches(Some(&json!("2024-01-01")), &json!("2024-02-01")));
        assert!(QueryOp::Ge.matches(Some(&json!(5)), &json!(5)));
        assert!(!QueryOp::Gt.matches(Some(&json!("5")), &json!(1)));
        assert!(QueryOp::ArrayContains.matches(Some(&json!(["x", "y"])), &json!("y")));
        assert!(!QueryOp::ArrayContains.matches(Some(&json!("y")), &json!("y")));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/emergency_siren_flood/"), "emergency_siren_flood");
    }
}
