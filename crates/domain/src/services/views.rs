//! Assembly of the dashboard, report and alerts read models.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Utc};
use shared::time::time_ago;

use super::aggregation;
use crate::models::alerts_view::{AlertTotals, AlertView, AlertsView, PersonView};
use crate::models::dashboard::{DashboardView, EmergencyView, RecentCase};
use crate::models::emergency::{CaseType, Emergency};
use crate::models::emergency_alert::{AlertList, EmergencyAlert};
use crate::models::report::{ReportFilter, ReportView};
use crate::models::user::User;

/// Active alerts shown on the dashboard.
pub const ACTIVE_ALERT_LIMIT: usize = 3;
/// Recent cases shown on the dashboard.
pub const RECENT_CASE_LIMIT: usize = 6;
/// Months in the report trend.
pub const TREND_MONTHS: u32 = 6;

/// Users keyed by id.
pub fn index_users(users: &[User]) -> HashMap<String, User> {
    users.iter().map(|u| (u.id.clone(), u.clone())).collect()
}

/// Sorts newest first; undated records go last.
pub fn sort_newest_first<T, F>(records: &mut [T], created: F)
where
    F: Fn(&T) -> Option<DateTime<Utc>>,
{
    records.sort_by(|a, b| created(b).cmp(&created(a)));
}

pub fn emergency_view(emergency: &Emergency, users: &HashMap<String, User>) -> EmergencyView {
    EmergencyView::new(emergency, |id| users.get(id))
}

/// `emergencies` is the full collection; `recent` the newest records, newest first.
pub fn build_dashboard(
    emergencies: &[Emergency],
    recent: &[Emergency],
    users: &[User],
    now: DateTime<Utc>,
) -> DashboardView {
    let lookup = index_users(users);

    let mut active: Vec<&Emergency> = emergencies
        .iter()
        .filter(|e| e.is_active && e.case_type.is_some())
        .collect();
    active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let active_alerts = active
        .into_iter()
        .take(ACTIVE_ALERT_LIMIT)
        .map(|e| emergency_view(e, &lookup))
        .collect();

    let recent_cases = recent
        .iter()
        .filter(|e| e.case_type.is_some())
        .filter(|e| {
            e.user_id
                .as_deref()
                .is_some_and(|id| lookup.contains_key(id))
        })
        .take(RECENT_CASE_LIMIT)
        .map(|e| RecentCase {
            emergency: emergency_view(e, &lookup),
            time_ago: e
                .created_at
                .map(|created| time_ago(created, now))
                .unwrap_or_else(|| "0 seconds ago".to_string()),
        })
        .collect();

    DashboardView {
        active_alerts,
        resolved_rates: aggregation::resolved_rates(emergencies, now),
        current_year: now.year(),
        yearly_stats: aggregation::yearly_case_type_histogram(emergencies, now.year()),
        recent_cases,
        total_users: users.len(),
    }
}

/// Builds the reports page for an optional barangay filter.
pub fn build_report(
    emergencies: &[Emergency],
    users: &[User],
    alert_count: usize,
    barangays: &[String],
    filter: ReportFilter,
    now: DateTime<Utc>,
) -> ReportView {
    let lookup = index_users(users);
    let barangay = filter
        .barangay
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty());

    let (filtered_users, filtered_emergencies): (Vec<&User>, Vec<&Emergency>) = match barangay {
        Some(name) => (
            users.iter().filter(|u| u.in_barangay(name)).collect(),
            aggregation::filter_by_barangay(
                emergencies,
                |e| e.user_id.as_deref().and_then(|id| lookup.get(id)),
                name,
            ),
        ),
        None => (users.iter().collect(), emergencies.iter().collect()),
    };

    let mut emergency_views: Vec<EmergencyView> = filtered_emergencies
        .iter()
        .map(|e| emergency_view(e, &lookup))
        .collect();
    sort_newest_first(&mut emergency_views, |e| e.created_at);

    ReportView {
        barangays: barangays.to_vec(),
        barangay_stats: aggregation::barangay_counts(users, barangays),
        total_emergencies: filtered_emergencies.len(),
        total_users: filtered_users.len(),
        total_alerts: alert_count,
        overall_emergencies: emergencies.len(),
        overall_users: users.len(),
        status_counts: aggregation::status_counts(filtered_emergencies.iter().copied()),
        case_type_stats: aggregation::case_type_stats(
            filtered_emergencies.iter().copied(),
            &aggregation::REPORT_EXCLUDED_CASE_TYPES,
        ),
        role_stats: aggregation::role_stats(filtered_users.iter().copied()),
        user_status: aggregation::user_status_counts(filtered_users.iter().copied()),
        monthly_data: aggregation::monthly_trend(
            filtered_emergencies.iter().copied(),
            TREND_MONTHS,
            now,
        ),
        emergencies: emergency_views,
        users: filtered_users.into_iter().cloned().collect(),
        filter,
    }
}

fn person_views(
    alert: &EmergencyAlert,
    list: AlertList,
    users: &HashMap<String, User>,
    status: &'static str,
) -> Vec<PersonView> {
    alert
        .list(list)
        .iter()
        .filter_map(|person| {
            let user = users.get(&person.user_id)?;
            Some(PersonView {
                user_id: person.user_id.clone(),
                full_name: if user.full_name.is_empty() {
                    "Unknown".to_string()
                } else {
                    user.full_name.clone()
                },
                username: if user.username.is_empty() {
                    "unknown".to_string()
                } else {
                    user.username.clone()
                },
                barangay: user
                    .barangay
                    .clone()
                    .unwrap_or_else(|| "N/A".to_string()),
                date_created: person.date_created,
                status,
            })
        })
        .collect()
}

fn alert_view(alert: &EmergencyAlert, users: &HashMap<String, User>) -> AlertView {
    let people_safe = person_views(alert, AlertList::PeopleSafe, users, "safe");
    let people_danger = person_views(alert, AlertList::PeopleDanger, users, "danger");
    let people_evacuating = person_views(alert, AlertList::PeopleEvacuating, users, "evacuating");
    AlertView {
        id: alert.id.clone(),
        emergency_type: alert.emergency_type.clone(),
        emergency_descriptions: alert.emergency_descriptions.clone(),
        date_created: alert.date_created,
        total_responses: people_safe.len() + people_danger.len() + people_evacuating.len(),
        people_safe,
        people_danger,
        people_evacuating,
    }
}

/// Alerts page. `filter` is `safe`, `danger` or `evacuating`; anything else shows all.
///
/// Totals always cover every alert; `filtered_count` reflects the filter.
pub fn build_alerts_view(alerts: &[EmergencyAlert], users: &[User], filter: Option<&str>) -> AlertsView {
    let lookup = index_users(users);
    let mut views: Vec<AlertView> = alerts.iter().map(|a| alert_view(a, &lookup)).collect();
    sort_newest_first(&mut views, |a| a.date_created);

    let total = |list: AlertList| views.iter().map(|a| a.people(list).len()).sum::<usize>();
    let safe = total(AlertList::PeopleSafe);
    let danger = total(AlertList::PeopleDanger);
    let evacuating = total(AlertList::PeopleEvacuating);
    let totals = AlertTotals {
        total_alerts: views.len(),
        total_people_safe: safe,
        total_people_danger: danger,
        total_people_evacuating: evacuating,
        total_responses: safe + danger + evacuating,
    };

    let selected = filter.and_then(AlertList::from_filter);
    let filtered: Vec<AlertView> = match selected {
        Some(list) => views
            .into_iter()
            .filter(|a| !a.people(list).is_empty())
            .collect(),
        None => views,
    };

    AlertsView {
        filtered_count: filtered.len(),
        alerts: filtered,
        totals,
        filter_status: selected.map(|l| match l {
            AlertList::PeopleSafe => "safe",
            AlertList::PeopleDanger => "danger",
            AlertList::PeopleEvacuating => "evacuating",
        }),
        case_types: CaseType::ALL.iter().map(|c| c.display_label()).collect(),
    }
}
