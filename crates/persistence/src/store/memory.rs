//! In-memory store implementations for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::AdminSession;
use serde_json::Value;
use shared::password::{check_new_password, hash_password, verify_password};
use tokio::sync::RwLock;

use super::{
    field_path, generate_document_id, lookup, normalize_email, normalize_path,
    AccountUpdate, Document, DocumentStore, Fields, IdentityAccount, IdentityProvider, QueryOp,
    RealtimeStore, SessionStore,
};
use crate::error::{IdentityError, RealtimeError, StoreError};
use crate::metrics::QueryTimer;

const BACKEND: &str = "memory";

/// Collections of documents kept in insertion order.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let timer = QueryTimer::new(BACKEND, "documents.get_by_id");
        let collections = self.collections.read().await;
        let found = collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned();
        timer.record();
        Ok(found)
    }

    async fn get_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let timer = QueryTimer::new(BACKEND, "documents.get_all");
        let collections = self.collections.read().await;
        let docs = collections.get(collection).cloned().unwrap_or_default();
        timer.record();
        Ok(docs)
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        op: QueryOp,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        let path = field_path(field)?;
        let timer = QueryTimer::new(BACKEND, "documents.query");
        let collections = self.collections.read().await;
        let docs = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| op.matches(lookup(&d.fields, &path), value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        timer.record();
        Ok(docs)
    }

    async fn create(
        &self,
        collection: &str,
        fields: Fields,
        id: Option<&str>,
    ) -> Result<String, StoreError> {
        let timer = QueryTimer::new(BACKEND, "documents.create");
        let id = id.map(str::to_string).unwrap_or_else(generate_document_id);
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        match docs.iter_mut().find(|d| d.id == id) {
            Some(existing) => existing.fields = fields,
            None => docs.push(Document::new(id.clone(), fields)),
        }
        timer.record();
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), StoreError> {
        let timer = QueryTimer::new(BACKEND, "documents.update");
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| StoreError::not_found(collection, id));
        let result = doc.map(|doc| doc.fields.extend(patch));
        timer.finish(result)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let timer = QueryTimer::new(BACKEND, "documents.delete");
        let mut collections = self.collections.write().await;
        let removed = match collections.get_mut(collection) {
            Some(docs) => {
                let before = docs.len();
                docs.retain(|d| d.id != id);
                docs.len() != before
            }
            None => false,
        };
        timer.record();
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Path-keyed values.
#[derive(Default)]
pub struct MemoryRealtimeStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryRealtimeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RealtimeStore for MemoryRealtimeStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, RealtimeError> {
        let values = self.values.read().await;
        Ok(values
            .get(normalize_path(path))
            .filter(|v| !v.is_null())
            .cloned())
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), RealtimeError> {
        let mut values = self.values.write().await;
        if value.is_null() {
            values.remove(normalize_path(path));
        } else {
            values.insert(normalize_path(path).to_string(), value);
        }
        Ok(())
    }
}

struct StoredAccount {
    account: IdentityAccount,
    password_hash: String,
}

/// Accounts with Argon2id password hashes, held in memory.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    accounts: RwLock<HashMap<String, StoredAccount>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<String, IdentityError> {
        check_new_password(password)?;
        let email = normalize_email(email);
        let password_hash = hash_password(password)?;
        let mut accounts = self.accounts.write().await;

        if accounts.values().any(|a| a.account.email == email) {
            return Err(IdentityError::EmailExists(email));
        }

        let id = generate_document_id();
        accounts.insert(
            id.clone(),
            StoredAccount {
                account: IdentityAccount {
                    id: id.clone(),
                    email,
                    display_name: display_name.map(str::to_string),
                    created_at: Utc::now(),
                },
                password_hash,
            },
        );
        Ok(id)
    }

    async fn lookup_by_email(&self, email: &str) -> Result<IdentityAccount, IdentityError> {
        let email = normalize_email(email);
        let accounts = self.accounts.read().await;
        accounts
            .values()
            .find(|a| a.account.email == email)
            .map(|a| a.account.clone())
            .ok_or(IdentityError::NotFound(email))
    }

    async fn get_account(&self, id: &str) -> Result<IdentityAccount, IdentityError> {
        let accounts = self.accounts.read().await;
        accounts
            .get(id)
            .map(|a| a.account.clone())
            .ok_or_else(|| IdentityError::NotFound(id.to_string()))
    }

    async fn update_account(&self, id: &str, update: AccountUpdate) -> Result<(), IdentityError> {
        let password_hash = match update.password.as_deref() {
            Some(password) => {
                check_new_password(password)?;
                Some(hash_password(password)?)
            }
            None => None,
        };
        let email = update.email.as_deref().map(normalize_email);

        let mut accounts = self.accounts.write().await;
        if let Some(email) = &email {
            if accounts
                .iter()
                .any(|(other, a)| other != id && &a.account.email == email)
            {
                return Err(IdentityError::EmailExists(email.clone()));
            }
        }

        let stored = accounts
            .get_mut(id)
            .ok_or_else(|| IdentityError::NotFound(id.to_string()))?;
        if let Some(email) = email {
            stored.account.email = email;
        }
        if let Some(name) = update.display_name {
            stored.account.display_name = Some(name);
        }
        if let Some(hash) = password_hash {
            stored.password_hash = hash;
        }
        Ok(())
    }

    async fn delete_account(&self, id: &str) -> Result<(), IdentityError> {
        let mut accounts = self.accounts.write().await;
        accounts
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| IdentityError::NotFound(id.to_string()))
    }

    async fn verify_password(&self, id: &str, password: &str) -> Result<bool, IdentityError> {
        let hash = {
            let accounts = self.accounts.read().await;
            accounts
                .get(id)
                .map(|a| a.password_hash.clone())
                .ok_or_else(|| IdentityError::NotFound(id.to_string()))?
        };
        Ok(verify_password(password, &hash)?)
    }
}

/// Sessions held in memory.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, AdminSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str, now: DateTime<Utc>) -> Result<Option<AdminSession>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(id).filter(|s| !s.is_expired(now)).cloned())
    }

    async fn save(&self, session: &AdminSession) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.sessions.write().await.remove(id);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }
}
