//! Domain layer for the RizAlert admin backend.
//!
//! This crate contains:
//! - Typed views over stored documents (User, Emergency, EmergencyAlert)
//! - The aggregation engine behind dashboards and reports
//! - The two-factor admin login state machine
//! - Notification feed construction

pub mod models;
pub mod services;
