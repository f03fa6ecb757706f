//! Emergency alert domain model (collection `emergency_alerts`).
//!
//! An alert is broadcast by administrators; citizens answer by landing in one
//! of three person lists.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::lenient;

/// The three response lists of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertList {
    PeopleSafe,
    PeopleDanger,
    PeopleEvacuating,
}

impl AlertList {
    pub const ALL: [AlertList; 3] = [
        AlertList::PeopleSafe,
        AlertList::PeopleDanger,
        AlertList::PeopleEvacuating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertList::PeopleSafe => "people_safe",
            AlertList::PeopleDanger => "people_danger",
            AlertList::PeopleEvacuating => "people_evacuating",
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            AlertList::PeopleSafe => "Safe",
            AlertList::PeopleDanger => "Danger",
            AlertList::PeopleEvacuating => "Evacuating",
        }
    }

    /// Parses the short filter names used by the alerts view.
    pub fn from_filter(filter: &str) -> Option<Self> {
        match filter.trim().to_lowercase().as_str() {
            "safe" => Some(AlertList::PeopleSafe),
            "danger" => Some(AlertList::PeopleDanger),
            "evacuating" => Some(AlertList::PeopleEvacuating),
            _ => None,
        }
    }
}

impl FromStr for AlertList {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "people_safe" => Ok(AlertList::PeopleSafe),
            "people_danger" => Ok(AlertList::PeopleDanger),
            "people_evacuating" => Ok(AlertList::PeopleEvacuating),
            _ => Err(format!("Invalid list name: {}", s)),
        }
    }
}

impl fmt::Display for AlertList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A person's response entry in one of the alert lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonResponse {
    #[serde(rename = "userId", default, deserialize_with = "lenient::or_default")]
    pub user_id: String,
    #[serde(default, with = "lenient::timestamp")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(
        rename = "fullName",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_string"
    )]
    pub full_name: Option<String>,
}

impl PersonResponse {
    pub fn new(user_id: impl Into<String>, date_created: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            date_created: Some(date_created),
            full_name: None,
        }
    }
}

/// An administratively created emergency alert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmergencyAlert {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub emergency_type: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub emergency_descriptions: String,
    #[serde(default, with = "lenient::timestamp")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub people_safe: Vec<PersonResponse>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub people_danger: Vec<PersonResponse>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub people_evacuating: Vec<PersonResponse>,
}

impl EmergencyAlert {
    pub fn list(&self, list: AlertList) -> &[PersonResponse] {
        match list {
            AlertList::PeopleSafe => &self.people_safe,
            AlertList::PeopleDanger => &self.people_danger,
            AlertList::PeopleEvacuating => &self.people_evacuating,
        }
    }

    pub fn list_mut(&mut self, list: AlertList) -> &mut Vec<PersonResponse> {
        match list {
            AlertList::PeopleSafe => &mut self.people_safe,
            AlertList::PeopleDanger => &mut self.people_danger,
            AlertList::PeopleEvacuating => &mut self.people_evacuating,
        }
    }

    /// Adds a person, replacing any entry with the same user id in that list.
    pub fn add_person(&mut self, list: AlertList, person: PersonResponse) {
        let entries = self.list_mut(list);
        entries.retain(|p| p.user_id != person.user_id);
        entries.push(person);
    }

    /// Removes every entry for `user_id`. Returns true if anything was removed.
    pub fn remove_person(&mut self, list: AlertList, user_id: &str) -> bool {
        let entries = self.list_mut(list);
        let before = entries.len();
        entries.retain(|p| p.user_id != user_id);
        entries.len() != before
    }

    pub fn total_responses(&self) -> usize {
        AlertList::ALL.iter().map(|l| self.list(*l).len()).sum()
    }
}

/// Request payload for creating an alert.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAlertRequest {
    #[validate(length(min = 1, message = "emergency_type is required"))]
    pub emergency_type: String,

    #[serde(default)]
    pub emergency_descriptions: String,
}

/// Request payload for adding a person to an alert list.
#[derive(Debug, Clone, Deserialize)]
pub struct AddPersonRequest {
    #[serde(default)]
    pub list_name: String,
    pub person: PersonInput,
}

impl AddPersonRequest {
    pub fn list(&self) -> Result<AlertList, String> {
        self.list_name.parse()
    }
}

/// Person entry as supplied by a client.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonInput {
    #[serde(rename = "userId", alias = "user_id")]
    pub user_id: String,
    #[serde(default, with = "lenient::timestamp")]
    pub date_created: Option<DateTime<Utc>>,
}

/// Request payload for removing a person from an alert list.
#[derive(Debug, Clone, Deserialize)]
pub struct RemovePersonRequest {
    #[serde(default)]
    pub list_name: String,
    #[serde(alias = "userId", alias = "user_id")]
    pub person_id: String,
}

impl RemovePersonRequest {
    pub fn list(&self) -> Result<AlertList, String> {
        self.list_name.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_alert_list_as_str() {
        assert_eq!(AlertList::PeopleSafe.as_str(), "people_safe");
        assert_eq!(AlertList::PeopleEvacuating.to_string(), "people_evacuating");
    }

    #[test]
    fn test_alert_list_from_str() {
        assert_eq!(
            "people_danger".parse::<AlertList>().unwrap(),
            AlertList::PeopleDanger
        );
        assert!("people_lost".parse::<AlertList>().is_err());
    }

    #[test]
    fn test_alert_list_from_filter() {
        assert_eq!(AlertList::from_filter("Safe"), Some(AlertList::PeopleSafe));
        assert_eq!(
            AlertList::from_filter("evacuating"),
            Some(AlertList::PeopleEvacuating)
        );
        assert_eq!(AlertList::from_filter("all"), None);
    }

    #[test]
    fn test_add_then_remove_returns_list_to_empty() {
        let mut alert = EmergencyAlert::default();
        alert.add_person(AlertList::PeopleSafe, PersonResponse::new("U1", at(1)));
        assert_eq!(alert.people_safe.len(), 1);

        assert!(alert.remove_person(AlertList::PeopleSafe, "U1"));
        assert!(alert.people_safe.is_empty());
    }

    #[test]
    fn test_add_person_replaces_same_user() {
        let mut alert = EmergencyAlert::default();
        alert.add_person(AlertList::PeopleDanger, PersonResponse::new("U1", at(1)));
        alert.add_person(AlertList::PeopleDanger, PersonResponse::new("U1", at(2)));

        assert_eq!(alert.people_danger.len(), 1);
        assert_eq!(alert.people_danger[0].date_created, Some(at(2)));
    }

    #[test]
    fn test_lists_are_independent() {
        let mut alert = EmergencyAlert::default();
        alert.add_person(AlertList::PeopleSafe, PersonResponse::new("U1", at(1)));
        alert.add_person(AlertList::PeopleEvacuating, PersonResponse::new("U1", at(1)));

        assert!(!alert.remove_person(AlertList::PeopleDanger, "U1"));
        assert_eq!(alert.total_responses(), 2);
    }

    #[test]
    fn test_alert_from_document() {
        let alert: EmergencyAlert = serde_json::from_value(json!({
            "id": "a1",
            "emergency_type": "Typhoon",
            "emergency_descriptions": "Signal No. 3",
            "date_created": "2024-07-01T00:00:00Z",
            "people_safe": [{"userId": "U1", "date_created": "2024-07-01T01:00:00Z"}],
            "people_danger": null
        }))
        .unwrap();

        assert_eq!(alert.people_safe.len(), 1);
        assert!(alert.people_danger.is_empty());
        assert!(alert.people_evacuating.is_empty());
        assert_eq!(alert.date_created, Some(at(0)));
    }

    #[test]
    fn test_add_person_request_parses_list_token() {
        let request: AddPersonRequest = serde_json::from_value(json!({
            "list_name": "people_evacuating",
            "person": {"userId": "U9"}
        }))
        .unwrap();
        assert_eq!(request.list(), Ok(AlertList::PeopleEvacuating));
        assert!(request.person.date_created.is_none());
    }

    #[test]
    fn test_remove_person_request_rejects_unknown_list() {
        let request: RemovePersonRequest = serde_json::from_value(json!({
            "list_name": "people_lost",
            "person_id": "U1"
        }))
        .unwrap();
        assert!(request.list().is_err());
    }
}
