//! Emergency alert repository (`emergency_alerts` collection).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::models::emergency_alert::CreateAlertRequest;
use domain::models::{AlertList, EmergencyAlert, PersonResponse};
use tracing::info;

use super::{decode_all, decode_one, newest, to_fields};
use crate::error::StoreError;
use crate::store::{DocumentStore, Fields};

pub const ALERTS: &str = "emergency_alerts";

#[derive(Clone)]
pub struct AlertRepository {
    docs: Arc<dyn DocumentStore>,
}

impl AlertRepository {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self { docs }
    }

    pub async fn list(&self) -> Result<Vec<EmergencyAlert>, StoreError> {
        let docs = self.docs.get_all(ALERTS).await?;
        Ok(decode_all(ALERTS, docs))
    }

    pub async fn get(&self, id: &str) -> Result<Option<EmergencyAlert>, StoreError> {
        Ok(self
            .docs
            .get_by_id(ALERTS, id)
            .await?
            .and_then(|doc| decode_one(ALERTS, doc)))
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.docs.get_all(ALERTS).await?.len())
    }

    /// Most recent alerts by `date_created`.
    pub async fn recent(&self, limit: usize) -> Result<Vec<EmergencyAlert>, StoreError> {
        Ok(newest(self.list().await?, |a| a.date_created, limit))
    }

    /// Stores a new alert with empty response lists.
    pub async fn create(
        &self,
        request: &CreateAlertRequest,
        now: DateTime<Utc>,
    ) -> Result<EmergencyAlert, StoreError> {
        let alert = EmergencyAlert {
            emergency_type: request.emergency_type.trim().to_string(),
            emergency_descriptions: request.emergency_descriptions.clone(),
            date_created: Some(now),
            ..Default::default()
        };

        let id = self.docs.create(ALERTS, to_fields(&alert)?, None).await?;
        info!(alert_id = %id, emergency_type = %alert.emergency_type, "Emergency alert created");
        Ok(EmergencyAlert { id, ..alert })
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let deleted = self.docs.delete(ALERTS, id).await?;
        if deleted {
            info!(alert_id = %id, "Emergency alert deleted");
        }
        Ok(deleted)
    }

    async fn write_list(&self, alert: &EmergencyAlert, list: AlertList) -> Result<(), StoreError> {
        let mut patch = Fields::new();
        patch.insert(
            list.as_str().to_string(),
            serde_json::to_value(alert.list(list))?,
        );
        self.docs.update(ALERTS, &alert.id, patch).await
    }

    /// Adds a person to one list, replacing an earlier entry for the same user.
    ///
    /// Returns `None` when the alert does not exist.
    pub async fn add_person(
        &self,
        id: &str,
        list: AlertList,
        person: PersonResponse,
    ) -> Result<Option<EmergencyAlert>, StoreError> {
        let Some(mut alert) = self.get(id).await? else {
            return Ok(None);
        };

        let user_id = person.user_id.clone();
        alert.add_person(list, person);
        self.write_list(&alert, list).await?;
        info!(alert_id = %id, list = %list.as_str(), user_id = %user_id, "Person added to alert");
        Ok(Some(alert))
    }

    /// Removes a user from one list. `None` when the alert does not exist.
    pub async fn remove_person(
        &self,
        id: &str,
        list: AlertList,
        user_id: &str,
    ) -> Result<Option<EmergencyAlert>, StoreError> {
        let Some(mut alert) = self.get(id).await? else {
            return Ok(None);
        };

        if alert.remove_person(list, user_id) {
            self.write_list(&alert, list).await?;
            info!(alert_id = %id, list = %list.as_str(), user_id = %user_id, "Person removed from alert");
        }
        Ok(Some(alert))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;
    use chrono::Duration;

    fn repo() -> AlertRepository {
        AlertRepository::new(Arc::new(MemoryDocumentStore::new()))
    }

    fn request(kind: &str) -> CreateAlertRequest {
        CreateAlertRequest {
            emergency_type: kind.to_string(),
            emergency_descriptions: "Evacuate low-lying areas".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_starts_with_empty_lists() {
        let repo = repo();
        let alert = repo.create(&request(" Typhoon "), Utc::now()).await.unwrap();

        let stored = repo.get(&alert.id).await.unwrap().unwrap();
        assert_eq!(stored.emergency_type, "Typhoon");
        assert_eq!(stored.total_responses(), 0);
        assert!(stored.date_created.is_some());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_person_replaces_same_user() {
        let repo = repo();
        let now = Utc::now();
        let alert = repo.create(&request("Flood"), now).await.unwrap();

        repo.add_person(&alert.id, AlertList::PeopleSafe, PersonResponse::new("u1", now))
            .await
            .unwrap();
        repo.add_person(
            &alert.id,
            AlertList::PeopleSafe,
            PersonResponse::new("u1", now + Duration::minutes(5)),
        )
        .await
        .unwrap();
        repo.add_person(&alert.id, AlertList::PeopleDanger, PersonResponse::new("u2", now))
            .await
            .unwrap();

        let stored = repo.get(&alert.id).await.unwrap().unwrap();
        assert_eq!(stored.people_safe.len(), 1);
        assert_eq!(stored.people_danger.len(), 1);
        assert_eq!(stored.total_responses(), 2);

        assert!(repo
            .add_person("missing", AlertList::PeopleSafe, PersonResponse::new("u1", now))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_remove_person() {
        let repo = repo();
        let now = Utc::now();
        let alert = repo.create(&request("Flood"), now).await.unwrap();
        repo.add_person(&alert.id, AlertList::PeopleEvacuating, PersonResponse::new("u1", now))
            .await
            .unwrap();

        let updated = repo
            .remove_person(&alert.id, AlertList::PeopleEvacuating, "u1")
            .await
            .unwrap()
            .unwrap();
        assert!(updated.people_evacuating.is_empty());

        let stored = repo.get(&alert.id).await.unwrap().unwrap();
        assert!(stored.people_evacuating.is_empty());
    }

    #[tokio::test]
    async fn test_recent_orders_by_date_created() {
        let repo = repo();
        let now = Utc::now();
        let old = repo.create(&request("Old"), now - Duration::days(2)).await.unwrap();
        let new = repo.create(&request("New"), now).await.unwrap();

        let recent = repo.recent(20).await.unwrap();
        assert_eq!(recent[0].id, new.id);
        assert_eq!(recent[1].id, old.id);
    }

    #[tokio::test]
    async fn test_recent_normalizes_offsets() {
        let docs = Arc::new(MemoryDocumentStore::new());
        let repo = AlertRepository::new(docs.clone());
        for (id, date_created) in [
            ("earlier", "2024-06-01T10:00:00+08:00"),
            ("later", "2024-06-01T03:00:00Z"),
        ] {
            let body = serde_json::json!({"emergency_type": "Flood", "date_created": date_created});
            docs.create(ALERTS, body.as_object().unwrap().clone(), Some(id))
                .await
                .unwrap();
        }

        let recent = repo.recent(1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, "later");
    }
}
