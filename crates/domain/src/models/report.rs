//! Read models for the reports page.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::dashboard::EmergencyView;
use super::user::User;

/// Users per canonical barangay, in list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BarangayCount {
    pub barangay: String,
    pub count: u64,
}

/// One calendar month of the emergency trend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthBucket {
    pub month: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub in_progress: u64,
    pub resolved: u64,
    pub active: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoleStats {
    pub citizen: u64,
    pub admin: u64,
    pub responder: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserStatusCounts {
    pub active: u64,
    pub inactive: u64,
}

/// Filters applied to a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportFilter {
    pub barangay: Option<String>,
    pub municipality: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub filter: ReportFilter,
    pub barangays: Vec<String>,
    pub barangay_stats: Vec<BarangayCount>,
    pub total_emergencies: usize,
    pub total_users: usize,
    pub total_alerts: usize,
    pub overall_emergencies: usize,
    pub overall_users: usize,
    pub status_counts: StatusCounts,
    pub case_type_stats: BTreeMap<String, u64>,
    pub role_stats: RoleStats,
    pub user_status: UserStatusCounts,
    pub monthly_data: Vec<MonthBucket>,
    pub emergencies: Vec<EmergencyView>,
    pub users: Vec<User>,
}
