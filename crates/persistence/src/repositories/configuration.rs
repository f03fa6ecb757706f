//! System configuration (`configuration/emergency_settings`).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::models::EmergencySettings;
use tracing::info;

use super::{decode_one, to_fields};
use crate::error::StoreError;
use crate::store::DocumentStore;

pub const CONFIGURATION: &str = "configuration";
pub const EMERGENCY_SETTINGS_ID: &str = "emergency_settings";

#[derive(Clone)]
pub struct ConfigurationRepository {
    docs: Arc<dyn DocumentStore>,
}

impl ConfigurationRepository {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self { docs }
    }

    /// Current settings; defaults when the document does not exist.
    pub async fn emergency_settings(&self) -> Result<EmergencySettings, StoreError> {
        Ok(self
            .docs
            .get_by_id(CONFIGURATION, EMERGENCY_SETTINGS_ID)
            .await?
            .and_then(|doc| decode_one(CONFIGURATION, doc))
            .unwrap_or_default())
    }

    /// Replaces the emergency hotline number.
    pub async fn update_emergency_number(
        &self,
        number: &str,
        updated_by: &str,
        now: DateTime<Utc>,
    ) -> Result<EmergencySettings, StoreError> {
        let settings = EmergencySettings {
            emergency_number: number.trim().to_string(),
            updated_at: Some(now),
            updated_by: Some(updated_by.to_string()),
        };

        self.docs
            .create(CONFIGURATION, to_fields(&settings)?, Some(EMERGENCY_SETTINGS_ID))
            .await?;
        info!(updated_by, "Emergency number updated");
        Ok(settings)
    }
}
