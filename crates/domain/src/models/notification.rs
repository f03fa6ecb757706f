//! Notification feed entries.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::emergency::{CaseType, EmergencyStatus};
use super::emergency_alert::AlertList;
use super::lenient;

/// Someone answered an alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertNotification {
    pub id: String,
    pub alert_id: String,
    pub alert_type: String,
    pub message: String,
    pub list: AlertList,
    pub list_label: &'static str,
    pub user_id: String,
    pub user_name: String,
    #[serde(with = "lenient::timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    pub read: bool,
}

/// A responder is attached to an emergency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponderNotification {
    pub id: String,
    pub emergency_id: String,
    pub emergency_type: Option<CaseType>,
    pub responder_id: String,
    pub responder_name: String,
    pub status: Option<EmergencyStatus>,
    pub arrived: bool,
    #[serde(with = "lenient::timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Alert(AlertNotification),
    Responder(ResponderNotification),
}

impl Notification {
    pub fn id(&self) -> &str {
        match self {
            Notification::Alert(n) => &n.id,
            Notification::Responder(n) => &n.id,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Notification::Alert(n) => n.timestamp,
            Notification::Responder(n) => n.timestamp,
        }
    }

    pub fn mark_read(&mut self, read: bool) {
        match self {
            Notification::Alert(n) => n.read = read,
            Notification::Responder(n) => n.read = read,
        }
    }

    pub fn is_read(&self) -> bool {
        match self {
            Notification::Alert(n) => n.read,
            Notification::Responder(n) => n.read,
        }
    }
}

/// Identifier of an alert-response notification.
pub fn alert_notification_id(alert_id: &str, list: AlertList, user_id: &str) -> String {
    format!("alert_{}_{}_{}", alert_id, list.as_str(), user_id)
}

/// Identifier of a responder notification.
pub fn responder_notification_id(emergency_id: &str, responder_id: &str) -> String {
    format!("responder_{}_{}", emergency_id, responder_id)
}
