//! HTTP route handlers.

use serde::Serialize;

pub mod alerts;
pub mod auth;
pub mod configuration;
pub mod dashboard;
pub mod emergencies;
pub mod emergency_alerts;
pub mod exports;
pub mod health;
pub mod html;
pub mod notifications;
pub mod profile;
pub mod reports;
pub mod sirens;
pub mod two_factor;
pub mod users;

/// Acknowledgement body for actions without a richer result.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
