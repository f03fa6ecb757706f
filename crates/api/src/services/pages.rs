//! Server-rendered admin pages.
//!
//! Each page is assembled from the same view models the JSON endpoints
//! return. Every piece of dynamic text goes through [`escape_html`].

use chrono::{DateTime, Utc};
use domain::models::alerts_view::AlertsView;
use domain::models::dashboard::{DashboardView, EmergencyView};
use domain::models::report::ReportView;
use domain::models::AlertList;

const STYLE: &str = "body{font-family:Helvetica,Arial,sans-serif;margin:0;background:#f4f6f8;color:#222}\
header{background:#b71c1c;color:#fff;padding:12px 24px}\
header a{color:#fff;margin-right:16px;text-decoration:none}\
main{padding:24px}\
.cards{display:flex;flex-wrap:wrap;gap:12px;margin-bottom:24px}\
.card{background:#fff;border-radius:6px;padding:12px 16px;min-width:140px;box-shadow:0 1px 2px rgba(0,0,0,.1)}\
.card .label{font-size:12px;color:#666}.card .value{font-size:22px;font-weight:bold}\
table{border-collapse:collapse;width:100%;background:#fff;margin-bottom:24px}\
th,td{border:1px solid #ddd;padding:6px 8px;text-align:left;font-size:13px}\
th{background:#eee}";

/// Escapes text for HTML element content and quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, admin_name: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title} | RizAlert</title>\n<style>{style}</style>\n</head>\n<body>\n\
         <header><strong>RizAlert</strong> &middot; \
         <a href=\"/admin/dashboard\">Dashboard</a>\
         <a href=\"/admin/reports\">Reports</a>\
         <a href=\"/admin/alerts\">Alerts</a>\
         <span>{admin}</span></header>\n<main>\n<h1>{title}</h1>\n{body}</main>\n</body>\n</html>\n",
        title = escape_html(title),
        style = STYLE,
        admin = escape_html(admin_name),
        body = body,
    )
}

fn cards(items: &[(&str, String)]) -> String {
    let mut html = String::from("<div class=\"cards\">");
    for (label, value) in items {
        html.push_str(&format!(
            "<div class=\"card\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>",
            escape_html(label),
            escape_html(value)
        ));
    }
    html.push_str("</div>\n");
    html
}

fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut html = String::from("<table><thead><tr>");
    for header in headers {
        html.push_str(&format!("<th>{}</th>", escape_html(header)));
    }
    html.push_str("</tr></thead><tbody>");
    if rows.is_empty() {
        html.push_str(&format!(
            "<tr><td colspan=\"{}\">No records</td></tr>",
            headers.len()
        ));
    }
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", escape_html(cell)));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>\n");
    html
}

fn section(heading: &str) -> String {
    format!("<h2>{}</h2>\n", escape_html(heading))
}

fn format_date(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

fn emergency_row(emergency: &EmergencyView) -> Vec<String> {
    vec![
        emergency.case_type_label.clone(),
        emergency.status_label.clone(),
        emergency.reported_by.clone(),
        emergency
            .location_text
            .clone()
            .unwrap_or_else(|| "N/A".to_string()),
        format_date(emergency.created_at),
    ]
}

const EMERGENCY_HEADERS: [&str; 5] = ["Type", "Status", "Reported By", "Location", "Created"];

pub fn render_dashboard(view: &DashboardView, admin_name: &str) -> String {
    let rates = &view.resolved_rates;
    let mut body = cards(&[
        ("Total Users", view.total_users.to_string()),
        ("Medical Resolved", format!("{}%", rates.medical)),
        ("Fire Resolved", format!("{}%", rates.fire)),
        ("Crime Resolved", format!("{}%", rates.crime)),
        ("Disaster Resolved", format!("{}%", rates.disaster)),
    ]);

    body.push_str(&section("Active Alerts"));
    let active: Vec<Vec<String>> = view.active_alerts.iter().map(emergency_row).collect();
    body.push_str(&table(&EMERGENCY_HEADERS, &active));

    body.push_str(&section(&format!("Cases in {}", view.current_year)));
    let yearly: Vec<Vec<String>> = view
        .yearly_stats
        .iter()
        .map(|(label, count)| vec![label.clone(), count.to_string()])
        .collect();
    body.push_str(&table(&["Case Type", "Count"], &yearly));

    body.push_str(&section("Recent Cases"));
    let recent: Vec<Vec<String>> = view
        .recent_cases
        .iter()
        .map(|case| {
            let mut row = emergency_row(&case.emergency);
            row.push(case.time_ago.clone());
            row
        })
        .collect();
    body.push_str(&table(
        &["Type", "Status", "Reported By", "Location", "Created", "When"],
        &recent,
    ));

    layout("Dashboard", admin_name, &body)
}

pub fn render_reports(view: &ReportView, admin_name: &str) -> String {
    let scope = match &view.filter.barangay {
        Some(barangay) => format!("{}, {}", barangay, view.filter.municipality),
        None => format!("All barangays, {}", view.filter.municipality),
    };

    let mut body = format!("<p>Scope: {}</p>\n", escape_html(&scope));
    body.push_str(&cards(&[
        ("Emergencies", view.total_emergencies.to_string()),
        ("Users", view.total_users.to_string()),
        ("Alerts", view.total_alerts.to_string()),
        ("Pending", view.status_counts.pending.to_string()),
        ("In Progress", view.status_counts.in_progress.to_string()),
        ("Resolved", view.status_counts.resolved.to_string()),
        ("Active", view.status_counts.active.to_string()),
    ]));

    body.push_str(&section("Users per Barangay"));
    let barangays: Vec<Vec<String>> = view
        .barangay_stats
        .iter()
        .map(|b| vec![b.barangay.clone(), b.count.to_string()])
        .collect();
    body.push_str(&table(&["Barangay", "Users"], &barangays));

    body.push_str(&section("Case Types"));
    let case_types: Vec<Vec<String>> = view
        .case_type_stats
        .iter()
        .map(|(label, count)| vec![label.clone(), count.to_string()])
        .collect();
    body.push_str(&table(&["Case Type", "Count"], &case_types));

    body.push_str(&section("Users"));
    body.push_str(&table(
        &["Citizens", "Admins", "Responders", "Active", "Inactive"],
        &[vec![
            view.role_stats.citizen.to_string(),
            view.role_stats.admin.to_string(),
            view.role_stats.responder.to_string(),
            view.user_status.active.to_string(),
            view.user_status.inactive.to_string(),
        ]],
    ));

    body.push_str(&section("Monthly Trend"));
    let months: Vec<Vec<String>> = view
        .monthly_data
        .iter()
        .map(|m| vec![m.month.clone(), m.count.to_string()])
        .collect();
    body.push_str(&table(&["Month", "Emergencies"], &months));

    body.push_str(&section("Emergencies"));
    let rows: Vec<Vec<String>> = view.emergencies.iter().map(emergency_row).collect();
    body.push_str(&table(&EMERGENCY_HEADERS, &rows));

    layout("Reports", admin_name, &body)
}

pub fn render_alerts(view: &AlertsView, admin_name: &str) -> String {
    let totals = &view.totals;
    let mut body = cards(&[
        ("Alerts", totals.total_alerts.to_string()),
        ("Safe", totals.total_people_safe.to_string()),
        ("In Danger", totals.total_people_danger.to_string()),
        ("Evacuating", totals.total_people_evacuating.to_string()),
        ("Responses", totals.total_responses.to_string()),
    ]);

    if let Some(filter) = view.filter_status {
        body.push_str(&format!(
            "<p>Showing {} alert(s) with people marked {}.</p>\n",
            view.filtered_count,
            escape_html(filter)
        ));
    }

    for alert in &view.alerts {
        body.push_str(&section(&format!(
            "{} ({})",
            alert.emergency_type,
            format_date(alert.date_created)
        )));
        body.push_str(&format!(
            "<p>{}</p>\n",
            escape_html(&alert.emergency_descriptions)
        ));

        let rows: Vec<Vec<String>> = AlertList::ALL
            .iter()
            .flat_map(|list| {
                alert.people(*list).iter().map(move |person| {
                    vec![
                        list.display_label().to_string(),
                        person.full_name.clone(),
                        person.username.clone(),
                        person.barangay.clone(),
                        format_date(person.date_created),
                    ]
                })
            })
            .collect();
        body.push_str(&table(
            &["Status", "Name", "Username", "Barangay", "Responded"],
            &rows,
        ));
    }

    layout("Emergency Alerts", admin_name, &body)
}
