//! Postgres store implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::AdminSession;
use serde_json::Value;
use shared::password::{check_new_password, hash_password, verify_password};
use sqlx::PgPool;

use super::{
    field_path, generate_document_id, normalize_email, normalize_path, AccountUpdate, Document,
    DocumentStore, Fields, IdentityAccount, IdentityProvider, QueryOp, RealtimeStore,
    SessionStore,
};
use crate::entities::{AdminSessionEntity, DocumentEntity, IdentityAccountEntity};
use crate::error::{IdentityError, RealtimeError, StoreError};
use crate::metrics::QueryTimer;

const BACKEND: &str = "postgres";

const DOCUMENT_COLUMNS: &str = "collection, id, data, created_at, updated_at";

fn path_param(field: &str) -> Result<Vec<String>, StoreError> {
    Ok(field_path(field)?.into_iter().map(str::to_string).collect())
}

/// SQL predicate over `data #> $2` (the field) and `$3` (the value).
fn predicate(op: QueryOp) -> &'static str {
    match op {
        QueryOp::Eq => "data #> $2 = $3",
        QueryOp::Ne => "data #> $2 IS NOT NULL AND data #> $2 <> $3",
        QueryOp::Lt => "jsonb_typeof(data #> $2) = jsonb_typeof($3) AND data #> $2 < $3",
        QueryOp::Le => "jsonb_typeof(data #> $2) = jsonb_typeof($3) AND data #> $2 <= $3",
        QueryOp::Gt => "jsonb_typeof(data #> $2) = jsonb_typeof($3) AND data #> $2 > $3",
        QueryOp::Ge => "jsonb_typeof(data #> $2) = jsonb_typeof($3) AND data #> $2 >= $3",
        QueryOp::ArrayContains => {
            "jsonb_typeof(data #> $2) = 'array' AND data #> $2 @> jsonb_build_array($3)"
        }
    }
}

/// Documents stored as JSONB rows of the `documents` table.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let timer = QueryTimer::new(BACKEND, "documents.get_by_id");
        let result = sqlx::query_as::<_, DocumentEntity>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE collection = $1 AND id = $2"
        ))
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await;

        Ok(timer.finish(result)?.map(Document::from))
    }

    async fn get_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let timer = QueryTimer::new(BACKEND, "documents.get_all");
        let result = sqlx::query_as::<_, DocumentEntity>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE collection = $1 ORDER BY created_at, id"
        ))
        .bind(collection)
        .fetch_all(&self.pool)
        .await;

        Ok(timer
            .finish(result)?
            .into_iter()
            .map(Document::from)
            .collect())
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        op: QueryOp,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        let path = path_param(field)?;
        let timer = QueryTimer::new(BACKEND, "documents.query");
        let result = sqlx::query_as::<_, DocumentEntity>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE collection = $1 AND {} ORDER BY created_at, id",
            predicate(op)
        ))
        .bind(collection)
        .bind(path)
        .bind(value)
        .fetch_all(&self.pool)
        .await;

        Ok(timer
            .finish(result)?
            .into_iter()
            .map(Document::from)
            .collect())
    }

    async fn create(
        &self,
        collection: &str,
        fields: Fields,
        id: Option<&str>,
    ) -> Result<String, StoreError> {
        let id = id.map(str::to_string).unwrap_or_else(generate_document_id);
        let timer = QueryTimer::new(BACKEND, "documents.create");
        let result = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            "#,
        )
        .bind(collection)
        .bind(&id)
        .bind(Value::Object(fields))
        .execute(&self.pool)
        .await;

        timer.finish(result)?;
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), StoreError> {
        let timer = QueryTimer::new(BACKEND, "documents.update");
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET data = data || $3, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Value::Object(patch))
        .execute(&self.pool)
        .await;

        if timer.finish(result)?.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let timer = QueryTimer::new(BACKEND, "documents.delete");
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await;

        Ok(timer.finish(result)?.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::db::ping(&self.pool).await?;
        Ok(())
    }
}

/// Realtime flags kept in the `realtime_values` table.
#[derive(Clone)]
pub struct PgRealtimeStore {
    pool: PgPool,
}

impl PgRealtimeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RealtimeStore for PgRealtimeStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, RealtimeError> {
        let timer = QueryTimer::new(BACKEND, "realtime.get");
        let result =
            sqlx::query_scalar::<_, Value>("SELECT value FROM realtime_values WHERE path = $1")
                .bind(normalize_path(path))
                .fetch_optional(&self.pool)
                .await;

        Ok(timer.finish(result)?.filter(|v| !v.is_null()))
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), RealtimeError> {
        let timer = QueryTimer::new(BACKEND, "realtime.set");
        let result = if value.is_null() {
            sqlx::query("DELETE FROM realtime_values WHERE path = $1")
                .bind(normalize_path(path))
                .execute(&self.pool)
                .await
        } else {
            sqlx::query(
                r#"
                INSERT INTO realtime_values (path, value)
                VALUES ($1, $2)
                ON CONFLICT (path) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
                "#,
            )
            .bind(normalize_path(path))
            .bind(value)
            .execute(&self.pool)
            .await
        };

        timer.finish(result)?;
        Ok(())
    }
}

fn unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Login accounts in `identity_accounts` with Argon2id hashes.
#[derive(Clone)]
pub struct PgIdentityProvider {
    pool: PgPool,
}

impl PgIdentityProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find(&self, column: &str, value: &str) -> Result<IdentityAccountEntity, IdentityError> {
        let timer = QueryTimer::new(BACKEND, format!("identity.find_by_{column}"));
        let result = sqlx::query_as::<_, IdentityAccountEntity>(&format!(
            r#"
            SELECT id, email, display_name, password_hash, created_at, updated_at
            FROM identity_accounts
            WHERE {column} = $1
            "#
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await;

        timer
            .finish(result)?
            .ok_or_else(|| IdentityError::NotFound(value.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for PgIdentityProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<String, IdentityError> {
        check_new_password(password)?;
        let email = normalize_email(email);
        let password_hash = hash_password(password)?;
        let id = generate_document_id();

        let timer = QueryTimer::new(BACKEND, "identity.create");
        let result = sqlx::query(
            r#"
            INSERT INTO identity_accounts (id, email, display_name, password_hash)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&id)
        .bind(&email)
        .bind(display_name)
        .bind(&password_hash)
        .execute(&self.pool)
        .await;

        match timer.finish(result) {
            Ok(_) => Ok(id),
            Err(e) if unique_violation(&e) => Err(IdentityError::EmailExists(email)),
            Err(e) => Err(e.into()),
        }
    }

    async fn lookup_by_email(&self, email: &str) -> Result<IdentityAccount, IdentityError> {
        self.find("email", &normalize_email(email))
            .await
            .map(IdentityAccount::from)
    }

    async fn get_account(&self, id: &str) -> Result<IdentityAccount, IdentityError> {
        self.find("id", id).await.map(IdentityAccount::from)
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

        let timer = QueryTimer::new(BACKEND, "identity.update");
        let result = sqlx::query(
            r#"
            UPDATE identity_accounts
            SET email = COALESCE($2, email),
                display_name = COALESCE($3, display_name),
                password_hash = COALESCE($4, password_hash),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&email)
        .bind(&update.display_name)
        .bind(&password_hash)
        .execute(&self.pool)
        .await;

        match timer.finish(result) {
            Ok(done) if done.rows_affected() == 0 => Err(IdentityError::NotFound(id.to_string())),
            Ok(_) => Ok(()),
            Err(e) if unique_violation(&e) => {
                Err(IdentityError::EmailExists(email.unwrap_or_default()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_account(&self, id: &str) -> Result<(), IdentityError> {
        let timer = QueryTimer::new(BACKEND, "identity.delete");
        let result = sqlx::query("DELETE FROM identity_accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;

        if timer.finish(result)?.rows_affected() == 0 {
            return Err(IdentityError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn verify_password(&self, id: &str, password: &str) -> Result<bool, IdentityError> {
        let account = self.find("id", id).await?;
        Ok(verify_password(password, &account.password_hash)?)
    }
}

/// Sessions in `admin_sessions`.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, id: &str, now: DateTime<Utc>) -> Result<Option<AdminSession>, StoreError> {
        let timer = QueryTimer::new(BACKEND, "sessions.load");
        let result = sqlx::query_as::<_, AdminSessionEntity>(
            "SELECT id, data, expires_at FROM admin_sessions WHERE id = $1 AND expires_at > $2",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await;

        match timer.finish(result)? {
            Some(entity) => Ok(Some(AdminSession::try_from(entity)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, session: &AdminSession) -> Result<(), StoreError> {
        let data = serde_json::to_value(session)?;
        let timer = QueryTimer::new(BACKEND, "sessions.save");
        let result = sqlx::query(
            r#"
            INSERT INTO admin_sessions (id, data, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (id)
            DO UPDATE SET data = EXCLUDED.data, expires_at = EXCLUDED.expires_at, updated_at = NOW()
            "#,
        )
        .bind(&session.id)
        .bind(data)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await;

        timer.finish(result)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let timer = QueryTimer::new(BACKEND, "sessions.delete");
        let result = sqlx::query("DELETE FROM admin_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;

        timer.finish(result)?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let timer = QueryTimer::new(BACKEND, "sessions.purge_expired");
        let result = sqlx::query("DELETE FROM admin_sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await;

        Ok(timer.finish(result)?.rows_affected())
    }
}
