//! Read models for the dashboard and emergency listings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::emergency::{CaseType, Emergency, EmergencyStatus, ResponderRecord};
use super::lenient;
use super::user::User;

/// Responder entry enriched with the responder's names.
#[derive(Debug, Clone, Serialize)]
pub struct ResponderView {
    pub responder_id: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub username: String,
    #[serde(with = "lenient::timestamp")]
    pub response_datetime: Option<DateTime<Utc>>,
    pub status: Option<EmergencyStatus>,
    #[serde(rename = "isArrived")]
    pub is_arrived: bool,
}

impl ResponderView {
    pub fn new(record: &ResponderRecord, user: Option<&User>) -> Self {
        Self {
            responder_id: record.responder_id.clone(),
            full_name: user
                .map(|u| u.full_name.clone())
                .unwrap_or_else(|| "Unknown User".to_string()),
            username: user
                .map(|u| u.username.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            response_datetime: record.response_datetime,
            status: record.status,
            is_arrived: record.is_arrived,
        }
    }
}

/// An emergency with reporter and responder details resolved.
#[derive(Debug, Clone, Serialize)]
pub struct EmergencyView {
    pub id: String,
    pub case_type: Option<CaseType>,
    pub case_type_label: String,
    pub user_id: Option<String>,
    pub username: String,
    pub reported_by: String,
    pub message: Option<String>,
    #[serde(with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    pub status: EmergencyStatus,
    pub status_label: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub file_id: Option<String>,
    pub location_text: Option<String>,
    pub responders: Vec<ResponderView>,
}

impl EmergencyView {
    /// `lookup` resolves user ids for the reporter and each responder.
    pub fn new<'a, F>(emergency: &Emergency, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<&'a User>,
    {
        let reporter = emergency.user_id.as_deref().and_then(&lookup);
        let status = emergency.effective_status();

        Self {
            id: emergency.id.clone(),
            case_type: emergency.case_type,
            case_type_label: emergency
                .case_type
                .map(|c| c.display_label().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            user_id: emergency.user_id.clone(),
            username: reporter
                .map(|u| u.username.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            reported_by: reporter
                .map(|u| u.display_name().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            message: emergency.message.clone(),
            created_at: emergency.created_at,
            is_active: emergency.is_active,
            status,
            status_label: status.display_label().to_string(),
            latitude: emergency.latitude,
            longitude: emergency.longitude,
            file_id: emergency.file_id.clone(),
            location_text: emergency.location_text.clone(),
            responders: emergency
                .responders
                .iter()
                .map(|r| ResponderView::new(r, lookup(r.responder_id.as_str())))
                .collect(),
        }
    }
}

/// Recent case row on the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct RecentCase {
    #[serde(flatten)]
    pub emergency: EmergencyView,
    pub time_ago: String,
}

/// 30-day resolved percentages, rounded to one decimal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResolvedRates {
    pub medical: f64,
    pub fire: f64,
    pub crime: f64,
    pub disaster: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub active_alerts: Vec<EmergencyView>,
    pub resolved_rates: ResolvedRates,
    pub current_year: i32,
    pub yearly_stats: BTreeMap<String, u64>,
    pub recent_cases: Vec<RecentCase>,
    pub total_users: usize,
}
