//! Emergency domain model (collection `emergency`).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::lenient;

/// Kind of reported emergency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CaseType {
    Typhoon,
    Fire,
    Crime,
    Flood,
    Medical,
    Disaster,
}

impl CaseType {
    pub const ALL: [CaseType; 6] = [
        CaseType::Typhoon,
        CaseType::Fire,
        CaseType::Crime,
        CaseType::Flood,
        CaseType::Medical,
        CaseType::Disaster,
    ];

    /// Weather-driven types grouped together on the dashboard.
    pub const DISASTER_GROUP: [CaseType; 3] =
        [CaseType::Typhoon, CaseType::Flood, CaseType::Disaster];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseType::Typhoon => "TYPHOON",
            CaseType::Fire => "FIRE",
            CaseType::Crime => "CRIME",
            CaseType::Flood => "FLOOD",
            CaseType::Medical => "MEDICAL",
            CaseType::Disaster => "DISASTER",
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            CaseType::Typhoon => "Typhoon",
            CaseType::Fire => "Fire",
            CaseType::Crime => "Crime",
            CaseType::Flood => "Flood",
            CaseType::Medical => "Medical",
            CaseType::Disaster => "Disaster",
        }
    }
}

impl FromStr for CaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TYPHOON" => Ok(CaseType::Typhoon),
            "FIRE" => Ok(CaseType::Fire),
            "CRIME" => Ok(CaseType::Crime),
            "FLOOD" => Ok(CaseType::Flood),
            "MEDICAL" => Ok(CaseType::Medical),
            "DISASTER" => Ok(CaseType::Disaster),
            _ => Err(format!("Invalid case type: {}", s)),
        }
    }
}

impl fmt::Display for CaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of an emergency or of one responder's involvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmergencyStatus {
    Pending,
    InProgress,
    UnderInvestigation,
    Monitoring,
    Resolved,
}

impl EmergencyStatus {
    pub const ALL: [EmergencyStatus; 5] = [
        EmergencyStatus::Pending,
        EmergencyStatus::InProgress,
        EmergencyStatus::UnderInvestigation,
        EmergencyStatus::Monitoring,
        EmergencyStatus::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyStatus::Pending => "PENDING",
            EmergencyStatus::InProgress => "IN_PROGRESS",
            EmergencyStatus::UnderInvestigation => "UNDER_INVESTIGATION",
            EmergencyStatus::Monitoring => "MONITORING",
            EmergencyStatus::Resolved => "RESOLVED",
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            EmergencyStatus::Pending => "Pending",
            EmergencyStatus::InProgress => "In Progress",
            EmergencyStatus::UnderInvestigation => "Under Investigation",
            EmergencyStatus::Monitoring => "Monitoring",
            EmergencyStatus::Resolved => "Resolved",
        }
    }
}

impl FromStr for EmergencyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace([' ', '-'], "_").as_str() {
            "PENDING" => Ok(EmergencyStatus::Pending),
            "IN_PROGRESS" => Ok(EmergencyStatus::InProgress),
            "UNDER_INVESTIGATION" => Ok(EmergencyStatus::UnderInvestigation),
            "MONITORING" => Ok(EmergencyStatus::Monitoring),
            "RESOLVED" => Ok(EmergencyStatus::Resolved),
            _ => Err(format!("Invalid emergency status: {}", s)),
        }
    }
}

impl fmt::Display for EmergencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One responder's involvement in an emergency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponderRecord {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub responder_id: String,
    #[serde(default, with = "lenient::timestamp")]
    pub response_datetime: Option<DateTime<Utc>>,
    #[serde(default, with = "lenient::token")]
    pub status: Option<EmergencyStatus>,
    #[serde(rename = "isArrived", default, deserialize_with = "lenient::or_default")]
    pub is_arrived: bool,
}

/// A reported emergency.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Emergency {
    #[serde(default)]
    pub id: String,
    #[serde(default, with = "lenient::token")]
    pub case_type: Option<CaseType>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub message: Option<String>,
    #[serde(default, with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "isActive", default, deserialize_with = "lenient::or_default")]
    pub is_active: bool,
    #[serde(default, with = "lenient::token")]
    pub status: Option<EmergencyStatus>,
    #[serde(default, deserialize_with = "lenient::optional_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_f64")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub location_text: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub file_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub responders: Vec<ResponderRecord>,
}

impl Emergency {
    /// Status with the stored default applied.
    pub fn effective_status(&self) -> EmergencyStatus {
        self.status.unwrap_or(EmergencyStatus::Pending)
    }

    pub fn is_resolved(&self) -> bool {
        self.effective_status() == EmergencyStatus::Resolved
    }

    pub fn responder(&self, responder_id: &str) -> Option<&ResponderRecord> {
        self.responders
            .iter()
            .find(|r| r.responder_id == responder_id)
    }

    /// Inserts or replaces the entry for `record.responder_id`.
    ///
    /// Duplicate entries left behind by older writers are collapsed into
    /// the replaced one.
    pub fn upsert_responder(&mut self, record: ResponderRecord) {
        match self
            .responders
            .iter()
            .position(|r| r.responder_id == record.responder_id)
        {
            Some(index) => {
                self.responders[index] = record;
                let id = self.responders[index].responder_id.clone();
                let mut seen = false;
                self.responders.retain(|r| {
                    if r.responder_id != id {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.responders.push(record),
        }
    }

    /// Replaces the whole responder list, one entry per responder id.
    pub fn replace_responders(&mut self, records: Vec<ResponderRecord>) {
        self.responders.clear();
        for mut record in records {
            record.responder_id = record.responder_id.trim().to_string();
            self.upsert_responder(record);
        }
    }

    /// Applies a partial responder update. Returns false if the responder is unknown.
    pub fn patch_responder(&mut self, patch: &ResponderPatch) -> bool {
        let responder_id = patch.responder_id.trim();
        match self
            .responders
            .iter_mut()
            .find(|r| r.responder_id == responder_id)
        {
            Some(record) => {
                if let Some(status) = patch.status {
                    record.status = Some(status);
                }
                if let Some(arrived) = patch.is_arrived {
                    record.is_arrived = arrived;
                }
                true
            }
            None => false,
        }
    }
}

/// Request payload for reporting an emergency.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateEmergencyRequest {
    pub case_type: Option<CaseType>,

    pub user_id: Option<String>,

    pub message: Option<String>,

    pub file_id: Option<String>,

    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,

    pub status: Option<EmergencyStatus>,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,

    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "Longitude must be between -180 and 180"
    ))]
    pub longitude: Option<f64>,

    pub location_text: Option<String>,
}

/// Partial update of an emergency.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateEmergencyRequest {
    pub case_type: Option<CaseType>,
    pub message: Option<String>,
    pub file_id: Option<String>,
    pub user_id: Option<String>,
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
    pub status: Option<EmergencyStatus>,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,
    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "Longitude must be between -180 and 180"
    ))]
    pub longitude: Option<f64>,
    pub location_text: Option<String>,
    pub responders: Option<Vec<ResponderRecord>>,
}

/// Request payload for attaching a responder.
#[derive(Debug, Clone, Deserialize)]
pub struct AddResponderRequest {
    #[serde(default)]
    pub responder_id: Option<String>,
    pub status: Option<EmergencyStatus>,
    #[serde(rename = "isArrived")]
    pub is_arrived: Option<bool>,
}

/// Partial update of one responder entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponderPatch {
    #[serde(default)]
    pub responder_id: String,
    pub status: Option<EmergencyStatus>,
    #[serde(rename = "isArrived")]
    pub is_arrived: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn responder(id: &str, status: EmergencyStatus, arrived: bool) -> ResponderRecord {
        ResponderRecord {
            responder_id: id.to_string(),
            response_datetime: None,
            status: Some(status),
            is_arrived: arrived,
        }
    }

    #[test]
    fn test_case_type_as_str() {
        assert_eq!(CaseType::Typhoon.as_str(), "TYPHOON");
        assert_eq!(CaseType::Medical.as_str(), "MEDICAL");
    }

    #[test]
    fn test_case_type_from_str() {
        assert_eq!("fire".parse::<CaseType>().unwrap(), CaseType::Fire);
        assert_eq!("DISASTER".parse::<CaseType>().unwrap(), CaseType::Disaster);
        assert!("earthquake".parse::<CaseType>().is_err());
    }

    #[test]
    fn test_case_type_display_label() {
        let labels: Vec<&str> = CaseType::ALL.iter().map(|c| c.display_label()).collect();
        assert_eq!(
            labels,
            vec!["Typhoon", "Fire", "Crime", "Flood", "Medical", "Disaster"]
        );
    }

    #[test]
    fn test_emergency_status_from_str() {
        assert_eq!(
            "in_progress".parse::<EmergencyStatus>().unwrap(),
            EmergencyStatus::InProgress
        );
        assert_eq!(
            "Under Investigation".parse::<EmergencyStatus>().unwrap(),
            EmergencyStatus::UnderInvestigation
        );
        assert!("closed".parse::<EmergencyStatus>().is_err());
    }

    #[test]
    fn test_emergency_status_display() {
        assert_eq!(EmergencyStatus::InProgress.to_string(), "IN_PROGRESS");
        assert_eq!(EmergencyStatus::InProgress.display_label(), "In Progress");
    }

    #[test]
    fn test_emergency_serde_tokens() {
        let value = serde_json::to_value(EmergencyStatus::UnderInvestigation).unwrap();
        assert_eq!(value, json!("UNDER_INVESTIGATION"));
        let case: CaseType = serde_json::from_value(json!("FLOOD")).unwrap();
        assert_eq!(case, CaseType::Flood);
    }

    #[test]
    fn test_emergency_from_document() {
        let emergency: Emergency = serde_json::from_value(json!({
            "id": "e1",
            "case_type": "MEDICAL",
            "user_id": "u1",
            "created_at": "2024-06-01 09:30:00",
            "isActive": true,
            "latitude": 14.6,
            "longitude": "121.2",
            "responders": [
                {"responder_id": "r1", "status": "IN_PROGRESS", "isArrived": false}
            ]
        }))
        .unwrap();

        assert_eq!(emergency.case_type, Some(CaseType::Medical));
        assert_eq!(emergency.effective_status(), EmergencyStatus::Pending);
        assert_eq!(emergency.longitude, Some(121.2));
        assert_eq!(emergency.responders.len(), 1);
        assert!(emergency.created_at.is_some());
    }

    #[test]
    fn test_emergency_tolerates_bad_fields() {
        let emergency: Emergency = serde_json::from_value(json!({
            "id": "e2",
            "case_type": "VOLCANO",
            "created_at": 12,
            "isActive": null,
            "responders": "none"
        }))
        .unwrap();

        assert_eq!(emergency.case_type, None);
        assert!(!emergency.is_active);
        assert!(emergency.responders.is_empty());
    }

    #[test]
    fn test_upsert_responder_replaces_existing() {
        let mut emergency = Emergency::default();
        emergency.upsert_responder(responder("r1", EmergencyStatus::InProgress, false));
        emergency.upsert_responder(responder("r2", EmergencyStatus::InProgress, false));
        emergency.upsert_responder(responder("r1", EmergencyStatus::Resolved, true));

        assert_eq!(emergency.responders.len(), 2);
        let r1 = emergency.responder("r1").unwrap();
        assert_eq!(r1.status, Some(EmergencyStatus::Resolved));
        assert!(r1.is_arrived);
    }

    #[test]
    fn test_upsert_responder_collapses_duplicates() {
        let mut emergency = Emergency {
            responders: vec![
                responder("r1", EmergencyStatus::Pending, false),
                responder("r1", EmergencyStatus::Pending, false),
            ],
            ..Default::default()
        };
        emergency.upsert_responder(responder("r1", EmergencyStatus::Monitoring, true));
        assert_eq!(emergency.responders.len(), 1);
        assert_eq!(
            emergency.responders[0].status,
            Some(EmergencyStatus::Monitoring)
        );
    }

    #[test]
    fn test_patch_responder_only_touches_supplied_fields() {
        let mut emergency = Emergency::default();
        emergency.upsert_responder(responder("r1", EmergencyStatus::InProgress, false));

        let patch = ResponderPatch {
            responder_id: "r1".into(),
            status: None,
            is_arrived: Some(true),
        };
        assert!(emergency.patch_responder(&patch));

        let r1 = emergency.responder("r1").unwrap();
        assert_eq!(r1.status, Some(EmergencyStatus::InProgress));
        assert!(r1.is_arrived);
    }

    #[test]
    fn test_replace_responders_keeps_last_entry_per_id() {
        let mut emergency = Emergency::default();
        emergency.upsert_responder(responder("old", EmergencyStatus::Pending, false));

        emergency.replace_responders(vec![
            responder("r1", EmergencyStatus::InProgress, false),
            responder("r2", EmergencyStatus::Monitoring, false),
            responder(" r1 ", EmergencyStatus::Resolved, true),
        ]);

        let ids: Vec<_> = emergency.responders.iter().map(|r| r.responder_id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);
        let r1 = emergency.responder("r1").unwrap();
        assert_eq!(r1.status, Some(EmergencyStatus::Resolved));
        assert!(r1.is_arrived);
    }

    #[test]
    fn test_patch_responder_ignores_surrounding_whitespace() {
        let mut emergency = Emergency::default();
        emergency.upsert_responder(responder("r1", EmergencyStatus::InProgress, false));

        let patch = ResponderPatch {
            responder_id: "  r1 ".into(),
            status: Some(EmergencyStatus::Resolved),
            is_arrived: None,
        };
        assert!(emergency.patch_responder(&patch));
        assert_eq!(
            emergency.responder("r1").unwrap().status,
            Some(EmergencyStatus::Resolved)
        );
    }

    #[test]
    fn test_patch_unknown_responder_is_noop() {
        let mut emergency = Emergency::default();
        let patch = ResponderPatch {
            responder_id: "ghost".into(),
            status: Some(EmergencyStatus::Resolved),
            is_arrived: None,
        };
        assert!(!emergency.patch_responder(&patch));
        assert!(emergency.responders.is_empty());
    }

    #[test]
    fn test_create_request_rejects_bad_coordinates() {
        let request: CreateEmergencyRequest = serde_json::from_value(json!({
            "case_type": "FIRE",
            "user_id": "u1",
            "latitude": 123.0
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }
}
