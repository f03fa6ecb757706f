//! Firebase Realtime Database over its REST interface.
//!
//! Values live at `{database_url}/{path}.json`; reads of a missing path
//! return JSON `null`. A database secret or ID token is passed as the
//! `auth` query parameter when configured.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;

use super::{normalize_path, RealtimeStore};
use crate::error::RealtimeError;
use crate::metrics::QueryTimer;

const BACKEND: &str = "firebase";

/// Realtime flag store backed by Firebase.
pub struct FirebaseRealtimeStore {
    client: Client,
    database_url: String,
    auth_token: Option<String>,
}

impl FirebaseRealtimeStore {
    pub fn new(
        database_url: &str,
        auth_token: Option<String>,
        timeout_ms: u64,
    ) -> Result<Self, RealtimeError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;

        Ok(Self {
            client,
            database_url: database_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.filter(|t| !t.is_empty()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.database_url, normalize_path(path))
    }

    fn auth_query(&self) -> Vec<(&'static str, &str)> {
        self.auth_token
            .as_deref()
            .map(|token| vec![("auth", token)])
            .unwrap_or_default()
    }

    async fn check(response: Response) -> Result<Response, RealtimeError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RealtimeError::Remote {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RealtimeStore for FirebaseRealtimeStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, RealtimeError> {
        let timer = QueryTimer::new(BACKEND, "realtime.get");
        let result: Result<Option<Value>, RealtimeError> = async {
            let response = self
                .client
                .get(self.url(path))
                .query(&self.auth_query())
                .send()
                .await?;
            let value: Value = Self::check(response).await?.json().await?;
            Ok(Some(value).filter(|v| !v.is_null()))
        }
        .await;

        timer.finish(result)
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), RealtimeError> {
        let timer = QueryTimer::new(BACKEND, "realtime.set");
        let result: Result<(), RealtimeError> = async {
            let response = self
                .client
                .put(self.url(path))
                .query(&self.auth_query())
                .json(&value)
                .send()
                .await?;
            Self::check(response).await.map(|_| ())
        }
        .await;

        timer.finish(result)
    }
}
