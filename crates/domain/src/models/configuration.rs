//! System configuration document (`configuration/emergency_settings`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::lenient;

pub const DEFAULT_EMERGENCY_NUMBER: &str = "911";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencySettings {
    #[serde(default = "default_emergency_number", deserialize_with = "number_or_default")]
    pub emergency_number: String,
    #[serde(default, with = "lenient::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub updated_by: Option<String>,
}

impl Default for EmergencySettings {
    fn default() -> Self {
        Self {
            emergency_number: default_emergency_number(),
            updated_at: None,
            updated_by: None,
        }
    }
}

fn default_emergency_number() -> String {
    DEFAULT_EMERGENCY_NUMBER.to_string()
}

fn number_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = lenient::optional_string(deserializer)?;
    Ok(value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(default_emergency_number))
}

/// Request payload for updating the settings.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_number"))]
    pub emergency_number: String,
}

fn validate_number(number: &str) -> Result<(), validator::ValidationError> {
    shared::validation::validate_emergency_number(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_number_defaults() {
        let settings: EmergencySettings = serde_json::from_value(json!({})).unwrap();
        assert_eq!(settings.emergency_number, "911");

        let settings: EmergencySettings =
            serde_json::from_value(json!({"emergency_number": ""})).unwrap();
        assert_eq!(settings.emergency_number, "911");
    }

    #[test]
    fn test_stored_number_is_kept() {
        let settings: EmergencySettings =
            serde_json::from_value(json!({"emergency_number": "+63 2 8911"})).unwrap();
        assert_eq!(settings.emergency_number, "+63 2 8911");
    }

    #[test]
    fn test_update_request_validation() {
        let ok = UpdateSettingsRequest {
            emergency_number: "117".into(),
        };
        assert!(ok.validate().is_ok());

        let blank = UpdateSettingsRequest {
            emergency_number: "  ".into(),
        };
        assert!(blank.validate().is_err());

        let letters = UpdateSettingsRequest {
            emergency_number: "call-me".into(),
        };
        assert!(letters.validate().is_err());
    }
}
