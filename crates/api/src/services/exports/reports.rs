//! Report builders for the export endpoints.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use domain::models::{AlertList, CaseType, Emergency, EmergencyAlert, User};

use super::csv::CsvWriter;
use super::pdf::{Column, PdfDocument, Table};
use super::{truncate_chars, ExportError};

/// Rows shown in the emergency and alert PDF tables.
pub const PDF_ROW_LIMIT: usize = 50;
const DESCRIPTION_LIMIT: usize = 50;

const CSV_DATE: &str = "%Y-%m-%d %H:%M:%S";
const PDF_DATE: &str = "%Y-%m-%d %H:%M";

/// Which collection an export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Users,
    Emergencies,
    Alerts,
    Complete,
}

impl ExportKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "users" => Some(ExportKind::Users),
            "emergencies" => Some(ExportKind::Emergencies),
            "alerts" => Some(ExportKind::Alerts),
            "complete" => Some(ExportKind::Complete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Users => "users",
            ExportKind::Emergencies => "emergencies",
            ExportKind::Alerts => "alerts",
            ExportKind::Complete => "complete",
        }
    }

    pub fn file_prefix(&self) -> &'static str {
        match self {
            ExportKind::Users => "users_report",
            ExportKind::Emergencies => "emergencies_report",
            ExportKind::Alerts => "alerts_report",
            ExportKind::Complete => "complete_system_report",
        }
    }
}

fn format_date(value: Option<DateTime<Utc>>, pattern: &str) -> String {
    value.map(|d| d.format(pattern).to_string()).unwrap_or_default()
}

fn reporter_username(emergency: &Emergency, users: &HashMap<String, User>) -> String {
    emergency
        .user_id
        .as_deref()
        .and_then(|id| users.get(id))
        .map(|u| u.username.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn case_type_token(emergency: &Emergency) -> &'static str {
    emergency.case_type.map(|c| c.as_str()).unwrap_or("")
}

pub fn users_csv(users: &[User]) -> String {
    let mut csv = CsvWriter::new();
    csv.write_row([
        "ID",
        "Username",
        "Full Name",
        "Email",
        "Role",
        "Department",
        "Status",
        "Address",
    ]);
    for user in users {
        csv.write_row([
            user.id.as_str(),
            user.username.as_str(),
            user.full_name.as_str(),
            user.email.as_str(),
            user.role.map(|r| r.as_str()).unwrap_or(""),
            user.department.as_deref().unwrap_or(""),
            user.status.map(|s| s.as_str()).unwrap_or(""),
            user.address.as_deref().unwrap_or(""),
        ]);
    }
    csv.finish()
}

pub fn emergencies_csv(emergencies: &[Emergency], users: &HashMap<String, User>) -> String {
    let mut csv = CsvWriter::new();
    csv.write_row([
        "ID",
        "Case Type",
        "Status",
        "Reported By",
        "Message",
        "Location Text",
        "Latitude",
        "Longitude",
        "Created At",
        "Is Active",
        "Responders Count",
    ]);
    for emergency in emergencies {
        csv.write_row([
            emergency.id.clone(),
            case_type_token(emergency).to_string(),
            emergency.effective_status().as_str().to_string(),
            reporter_username(emergency, users),
            emergency.message.clone().unwrap_or_default(),
            emergency.location_text.clone().unwrap_or_default(),
            emergency.latitude.map(|v| v.to_string()).unwrap_or_default(),
            emergency.longitude.map(|v| v.to_string()).unwrap_or_default(),
            format_date(emergency.created_at, CSV_DATE),
            emergency.is_active.to_string(),
            emergency.responders.len().to_string(),
        ]);
    }
    csv.finish()
}

pub fn alerts_csv(alerts: &[EmergencyAlert]) -> String {
    let mut csv = CsvWriter::new();
    csv.write_row([
        "ID",
        "Emergency Type",
        "Description",
        "Date Created",
        "People Safe",
        "People in Danger",
        "People Evacuating",
    ]);
    for alert in alerts {
        csv.write_row([
            alert.id.clone(),
            alert.emergency_type.clone(),
            alert.emergency_descriptions.clone(),
            format_date(alert.date_created, CSV_DATE),
            alert.people_safe.len().to_string(),
            alert.people_danger.len().to_string(),
            alert.people_evacuating.len().to_string(),
        ]);
    }
    csv.finish()
}

fn generated_on(doc: &mut PdfDocument, now: DateTime<Utc>) {
    doc.text(&format!("Generated on: {}", now.format(CSV_DATE)));
    doc.spacer(10.0);
}

pub fn users_pdf(users: &[User], now: DateTime<Utc>) -> Result<Vec<u8>, ExportError> {
    let mut doc = PdfDocument::new();
    doc.title("Users Report");
    generated_on(&mut doc, now);

    let mut table = Table::new(vec![
        Column::new("Username", 90.0),
        Column::new("Full Name", 110.0),
        Column::new("Email", 130.0),
        Column::new("Role", 70.0),
        Column::new("Status", 95.0),
    ]);
    for user in users {
        table.push_row(vec![
            truncate_chars(&user.username, 20),
            truncate_chars(&user.full_name, 25),
            truncate_chars(&user.email, 30),
            truncate_chars(user.role.map(|r| r.as_str()).unwrap_or(""), 15),
            user.status.map(|s| s.as_str()).unwrap_or("").to_string(),
        ]);
    }
    doc.table(&table);
    doc.text(&format!("Total Users: {}", users.len()));

    doc.render()
}

/// Newest-first emergencies are expected; only the first rows are tabled.
pub fn emergencies_pdf(
    emergencies: &[Emergency],
    users: &HashMap<String, User>,
    now: DateTime<Utc>,
) -> Result<Vec<u8>, ExportError> {
    let active = emergencies.iter().filter(|e| e.is_active).count();
    let resolved = emergencies.iter().filter(|e| e.is_resolved()).count();

    let mut doc = PdfDocument::new();
    doc.title("Emergencies Report");
    generated_on(&mut doc, now);
    doc.text(&format!(
        "Total Emergencies: {} | Active: {} | Resolved: {}",
        emergencies.len(),
        active,
        resolved
    ));
    doc.spacer(6.0);

    let mut table = Table::new(vec![
        Column::new("Type", 50.0),
        Column::new("Status", 60.0),
        Column::new("Reported By", 70.0),
        Column::new("Location", 135.0),
        Column::new("Created", 75.0),
    ]);
    for emergency in emergencies.iter().take(PDF_ROW_LIMIT) {
        let location = emergency
            .location_text
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or("N/A");
        table.push_row(vec![
            truncate_chars(case_type_token(emergency), 10),
            truncate_chars(emergency.effective_status().as_str(), 12),
            truncate_chars(&reporter_username(emergency, users), 15),
            truncate_chars(location, 30),
            format_date(emergency.created_at, PDF_DATE),
        ]);
    }
    doc.table(&table);

    doc.render()
}

struct AlertTotals {
    safe: usize,
    danger: usize,
    evacuating: usize,
}

fn alert_totals(alerts: &[EmergencyAlert]) -> AlertTotals {
    let count = |list: AlertList| alerts.iter().map(|a| a.list(list).len()).sum();
    AlertTotals {
        safe: count(AlertList::PeopleSafe),
        danger: count(AlertList::PeopleDanger),
        evacuating: count(AlertList::PeopleEvacuating),
    }
}

pub fn complete_pdf(
    users: &[User],
    emergencies: &[Emergency],
    alerts: &[EmergencyAlert],
    now: DateTime<Utc>,
) -> Result<Vec<u8>, ExportError> {
    let mut doc = PdfDocument::new();
    doc.title("RizAlert Complete System Report");
    generated_on(&mut doc, now);

    doc.heading("System Overview");
    let mut overview = Table::new(vec![Column::new("Metric", 250.0), Column::new("Count", 100.0)]);
    let metrics = [
        ("Total Users", users.len()),
        ("Total Emergencies", emergencies.len()),
        (
            "Active Emergencies",
            emergencies.iter().filter(|e| e.is_active).count(),
        ),
        ("Emergency Alerts", alerts.len()),
        (
            "Resolved Cases",
            emergencies.iter().filter(|e| e.is_resolved()).count(),
        ),
    ];
    for (label, value) in metrics {
        overview.push_row(vec![label.to_string(), value.to_string()]);
    }
    doc.table(&overview);

    doc.heading("Emergency Types Breakdown");
    let mut breakdown = Table::new(vec![
        Column::new("Emergency Type", 250.0),
        Column::new("Count", 100.0),
    ]);
    for case_type in CaseType::ALL {
        let count = emergencies
            .iter()
            .filter(|e| e.case_type == Some(case_type))
            .count();
        breakdown.push_row(vec![case_type.display_label().to_string(), count.to_string()]);
    }
    doc.table(&breakdown);

    doc.heading("Emergency Alerts Overview");
    let totals = alert_totals(alerts);
    let mut alert_table = Table::new(vec![Column::new("Metric", 250.0), Column::new("Count", 100.0)]);
    for (label, value) in [
        ("Total Alerts", alerts.len()),
        ("People Safe", totals.safe),
        ("People in Danger", totals.danger),
        ("People Evacuating", totals.evacuating),
    ] {
        alert_table.push_row(vec![label.to_string(), value.to_string()]);
    }
    doc.table(&alert_table);

    doc.spacer(10.0);
    doc.text("Report generated by RizAlert Emergency Management System");

    doc.render()
}

pub fn alerts_pdf(alerts: &[EmergencyAlert], now: DateTime<Utc>) -> Result<Vec<u8>, ExportError> {
    let totals = alert_totals(alerts);

    let mut doc = PdfDocument::new();
    doc.title("Emergency Alerts Report");
    generated_on(&mut doc, now);
    doc.text(&format!(
        "Total Alerts: {} | People Safe: {} | People in Danger: {} | People Evacuating: {}",
        alerts.len(),
        totals.safe,
        totals.danger,
        totals.evacuating
    ));
    doc.spacer(6.0);

    let mut table = Table::new(vec![
        Column::new("Type", 55.0),
        Column::new("Description", 235.0),
        Column::new("Date Created", 80.0),
        Column::new("Safe", 35.0),
        Column::new("Danger", 40.0),
        Column::new("Evacuating", 50.0),
    ]);
    for alert in alerts.iter().take(PDF_ROW_LIMIT) {
        let description = if alert.emergency_descriptions.chars().count() > DESCRIPTION_LIMIT {
            format!(
                "{}...",
                truncate_chars(&alert.emergency_descriptions, DESCRIPTION_LIMIT)
            )
        } else {
            alert.emergency_descriptions.clone()
        };
        table.push_row(vec![
            truncate_chars(&alert.emergency_type, 10),
            description,
            format_date(alert.date_created, PDF_DATE),
            alert.people_safe.len().to_string(),
            alert.people_danger.len().to_string(),
            alert.people_evacuating.len().to_string(),
        ]);
    }
    doc.table(&table);

    doc.render()
}
