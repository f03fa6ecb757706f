//! Siren state (realtime store) and its change log (record store).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::models::siren::{SirenChange, SirenLog};
use domain::models::{SirenAction, SirenStates, SirenType};
use serde_json::{json, Value};
use shared::time::format_timestamp;
use tracing::info;

use super::{decode_all, newest};
use crate::error::{RepositoryError, StoreError};
use crate::store::{DocumentStore, Fields, RealtimeStore};

/// Log entries shown per action on the sirens page.
pub const LOG_LIMIT: usize = 20;

/// Reads a stored flag; anything other than a truthy value is "off".
fn as_flag(value: Option<Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "1"),
        _ => false,
    }
}

#[derive(Clone)]
pub struct SirenRepository {
    realtime: Arc<dyn RealtimeStore>,
    docs: Arc<dyn DocumentStore>,
}

impl SirenRepository {
    pub fn new(realtime: Arc<dyn RealtimeStore>, docs: Arc<dyn DocumentStore>) -> Self {
        Self { realtime, docs }
    }

    pub async fn state(&self, siren: SirenType) -> Result<bool, RepositoryError> {
        Ok(as_flag(self.realtime.get(&siren.realtime_path()).await?))
    }

    pub async fn states(&self) -> Result<SirenStates, RepositoryError> {
        let mut states = SirenStates::default();
        for siren in SirenType::ALL {
            states.set(siren, self.state(siren).await?);
        }
        Ok(states)
    }

    /// Sets a siren and appends a log entry for the resulting action.
    pub async fn set_state(
        &self,
        siren: SirenType,
        active: bool,
        triggered_by: &str,
        now: DateTime<Utc>,
    ) -> Result<SirenChange, RepositoryError> {
        let previous = self.state(siren).await?;
        self.realtime
            .set(&siren.realtime_path(), Value::Bool(active))
            .await?;

        let action = SirenAction::for_state(active);
        let mut entry = Fields::new();
        entry.insert("siren_type".into(), json!(siren.as_str()));
        entry.insert("timestamp".into(), json!(format_timestamp(now)));
        entry.insert("triggered_by".into(), json!(triggered_by));
        self.docs
            .create(action.log_collection(), entry, None)
            .await?;

        info!(siren = %siren, previous, active, triggered_by, "Siren state changed");
        Ok(SirenChange::new(siren, previous, active))
    }

    pub async fn toggle(
        &self,
        siren: SirenType,
        triggered_by: &str,
        now: DateTime<Utc>,
    ) -> Result<SirenChange, RepositoryError> {
        let current = self.state(siren).await?;
        self.set_state(siren, !current, triggered_by, now).await
    }

    /// Most recent log entries for one action.
    pub async fn recent_logs(
        &self,
        action: SirenAction,
        limit: usize,
    ) -> Result<Vec<SirenLog>, StoreError> {
        let collection = action.log_collection();
        let docs = self.docs.get_all(collection).await?;
        let logs: Vec<SirenLog> = decode_all(collection, docs);
        Ok(newest(logs, |l| l.timestamp, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryDocumentStore, MemoryRealtimeStore};
    use chrono::Duration;

    fn repo() -> (SirenRepository, Arc<MemoryRealtimeStore>) {
        let realtime = Arc::new(MemoryRealtimeStore::new());
        let repo = SirenRepository::new(realtime.clone(), Arc::new(MemoryDocumentStore::new()));
        (repo, realtime)
    }

    #[test]
    fn test_as_flag() {
        assert!(as_flag(Some(json!(true))));
        assert!(as_flag(Some(json!(1))));
        assert!(as_flag(Some(json!("true"))));
        assert!(!as_flag(Some(json!(0))));
        assert!(!as_flag(Some(json!("no"))));
        assert!(!as_flag(None));
    }

    #[tokio::test]
    async fn test_missing_values_read_false() {
        let (repo, _) = repo();
        assert_eq!(repo.states().await.unwrap(), SirenStates::default());
    }

    #[tokio::test]
    async fn test_toggle_flips_and_reports() {
        let (repo, realtime) = repo();
        let now = Utc::now();

        let first = repo.toggle(SirenType::Flood, "admin", now).await.unwrap();
        assert_eq!(first.siren_type, "FLOOD");
        assert!(!first.previous_status);
        assert!(first.new_status);
        assert_eq!(first.action, SirenAction::Activated);
        assert_eq!(
            realtime.get("emergency_siren_flood").await.unwrap(),
            Some(json!(true))
        );

        let second = repo.toggle(SirenType::Flood, "admin", now).await.unwrap();
        assert!(second.previous_status);
        assert!(!second.new_status);
        assert_eq!(second.action, SirenAction::Deactivated);
    }

    #[tokio::test]
    async fn test_state_changes_are_logged() {
        let (repo, _) = repo();
        let now = Utc::now();
        repo.set_state(SirenType::Typhoon, true, "ana", now - Duration::minutes(2))
            .await
            .unwrap();
        repo.set_state(SirenType::Earthquake, true, "ben", now)
            .await
            .unwrap();
        repo.set_state(SirenType::Typhoon, false, "ana", now)
            .await
            .unwrap();

        let activations = repo
            .recent_logs(SirenAction::Activated, LOG_LIMIT)
            .await
            .unwrap();
        assert_eq!(activations.len(), 2);
        assert_eq!(activations[0].siren_type, "earthquake");
        assert_eq!(activations[0].triggered_by, "ben");

        let deactivations = repo
            .recent_logs(SirenAction::Deactivated, LOG_LIMIT)
            .await
            .unwrap();
        assert_eq!(deactivations.len(), 1);

        let states = repo.states().await.unwrap();
        assert!(!states.typhoon);
        assert!(states.earthquake);
    }
}
