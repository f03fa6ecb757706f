//! Read model for the alerts page.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::emergency_alert::AlertList;
use super::lenient;

/// A listed person with their user details.
#[derive(Debug, Clone, Serialize)]
pub struct PersonView {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub username: String,
    pub barangay: String,
    #[serde(with = "lenient::timestamp")]
    pub date_created: Option<DateTime<Utc>>,
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertView {
    pub id: String,
    pub emergency_type: String,
    pub emergency_descriptions: String,
    #[serde(with = "lenient::timestamp")]
    pub date_created: Option<DateTime<Utc>>,
    pub people_safe: Vec<PersonView>,
    pub people_danger: Vec<PersonView>,
    pub people_evacuating: Vec<PersonView>,
    pub total_responses: usize,
}

impl AlertView {
    pub fn people(&self, list: AlertList) -> &[PersonView] {
        match list {
            AlertList::PeopleSafe => &self.people_safe,
            AlertList::PeopleDanger => &self.people_danger,
            AlertList::PeopleEvacuating => &self.people_evacuating,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertTotals {
    pub total_alerts: usize,
    pub total_people_safe: usize,
    pub total_people_danger: usize,
    pub total_people_evacuating: usize,
    pub total_responses: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertsView {
    pub alerts: Vec<AlertView>,
    #[serde(flatten)]
    pub totals: AlertTotals,
    pub filter_status: Option<&'static str>,
    pub filtered_count: usize,
    pub case_types: Vec<&'static str>,
}
