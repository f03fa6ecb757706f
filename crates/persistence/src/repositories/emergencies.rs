//! Emergency repository (`emergency` collection).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::models::emergency::{CreateEmergencyRequest, ResponderPatch, UpdateEmergencyRequest};
use domain::models::{CaseType, Emergency, EmergencyStatus, ResponderRecord};
use serde_json::json;
use shared::time::format_timestamp;
use tracing::info;

use super::{decode_all, decode_one, newest, set_opt, to_fields};
use crate::error::StoreError;
use crate::store::{DocumentStore, Fields};

pub const EMERGENCIES: &str = "emergency";

/// Repository for emergency reports.
#[derive(Clone)]
pub struct EmergencyRepository {
    docs: Arc<dyn DocumentStore>,
}

impl EmergencyRepository {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self { docs }
    }

    pub async fn list(&self) -> Result<Vec<Emergency>, StoreError> {
        let docs = self.docs.get_all(EMERGENCIES).await?;
        Ok(decode_all(EMERGENCIES, docs))
    }

    pub async fn get(&self, id: &str) -> Result<Option<Emergency>, StoreError> {
        Ok(self
            .docs
            .get_by_id(EMERGENCIES, id)
            .await?
            .and_then(|doc| decode_one(EMERGENCIES, doc)))
    }

    /// Most recent emergencies by `created_at`.
    pub async fn recent(&self, limit: usize) -> Result<Vec<Emergency>, StoreError> {
        Ok(newest(self.list().await?, |e| e.created_at, limit))
    }

    /// Stores a new report. Unset fields take the reporting defaults.
    pub async fn create(
        &self,
        case_type: CaseType,
        request: &CreateEmergencyRequest,
        now: DateTime<Utc>,
    ) -> Result<Emergency, StoreError> {
        let emergency = Emergency {
            id: String::new(),
            case_type: Some(case_type),
            user_id: request.user_id.clone(),
            message: request.message.clone(),
            created_at: Some(now),
            is_active: request.is_active.unwrap_or(true),
            status: Some(request.status.unwrap_or(EmergencyStatus::Pending)),
            latitude: request.latitude,
            longitude: request.longitude,
            location_text: request.location_text.clone(),
            file_id: request.file_id.clone(),
            responders: Vec::new(),
        };

        let id = self
            .docs
            .create(EMERGENCIES, to_fields(&emergency)?, None)
            .await?;
        info!(emergency_id = %id, case_type = %case_type, "Emergency created");
        Ok(Emergency { id, ..emergency })
    }

    /// Applies a partial update. Returns `None` when the emergency does not exist.
    pub async fn update(
        &self,
        id: &str,
        request: &UpdateEmergencyRequest,
        now: DateTime<Utc>,
    ) -> Result<Option<Emergency>, StoreError> {
        let Some(mut current) = self.get(id).await? else {
            return Ok(None);
        };

        let mut patch = Fields::new();
        set_opt(&mut patch, "case_type", request.case_type.map(|c| c.as_str()));
        set_opt(&mut patch, "message", request.message.clone());
        set_opt(&mut patch, "file_id", request.file_id.clone());
        set_opt(&mut patch, "user_id", request.user_id.clone());
        set_opt(&mut patch, "isActive", request.is_active);
        set_opt(&mut patch, "status", request.status.map(|s| s.as_str()));
        set_opt(&mut patch, "latitude", request.latitude);
        set_opt(&mut patch, "longitude", request.longitude);
        set_opt(&mut patch, "location_text", request.location_text.clone());
        if let Some(responders) = &request.responders {
            current.replace_responders(responders.clone());
            patch.insert(
                "responders".into(),
                serde_json::to_value(&current.responders)?,
            );
        }
        patch.insert("updated_at".into(), json!(format_timestamp(now)));

        self.docs.update(EMERGENCIES, id, patch).await?;
        info!(emergency_id = %id, "Emergency updated");
        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let deleted = self.docs.delete(EMERGENCIES, id).await?;
        if deleted {
            info!(emergency_id = %id, "Emergency deleted");
        }
        Ok(deleted)
    }

    async fn write_responders(&self, emergency: &Emergency) -> Result<(), StoreError> {
        let mut patch = Fields::new();
        patch.insert(
            "responders".into(),
            serde_json::to_value(&emergency.responders)?,
        );
        self.docs.update(EMERGENCIES, &emergency.id, patch).await
    }

    /// Attaches a responder, replacing an existing entry for the same id.
    ///
    /// Returns `None` when the emergency does not exist.
    pub async fn add_responder(
        &self,
        id: &str,
        record: ResponderRecord,
    ) -> Result<Option<Emergency>, StoreError> {
        let Some(mut emergency) = self.get(id).await? else {
            return Ok(None);
        };

        let responder_id = record.responder_id.clone();
        emergency.upsert_responder(record);
        self.write_responders(&emergency).await?;
        info!(emergency_id = %id, responder_id = %responder_id, "Responder added");
        Ok(Some(emergency))
    }

    /// Changes one responder entry.
    ///
    /// `None` when the emergency does not exist, `Some(false)` when the
    /// responder is not attached (nothing is written).
    pub async fn update_responder(
        &self,
        id: &str,
        patch: &ResponderPatch,
    ) -> Result<Option<bool>, StoreError> {
        let Some(mut emergency) = self.get(id).await? else {
            return Ok(None);
        };

        if !emergency.patch_responder(patch) {
            return Ok(Some(false));
        }
        self.write_responders(&emergency).await?;
        info!(emergency_id = %id, responder_id = %patch.responder_id.trim(), "Responder updated");
        Ok(Some(true))
    }
}

/// Builds the record for a newly attached responder.
pub fn new_responder(
    responder_id: String,
    status: Option<EmergencyStatus>,
    is_arrived: Option<bool>,
    now: DateTime<Utc>,
) -> ResponderRecord {
    ResponderRecord {
        responder_id,
        response_datetime: Some(now),
        status: Some(status.unwrap_or(EmergencyStatus::InProgress)),
        is_arrived: is_arrived.unwrap_or(false),
    }
}
