//! Aggregation engine for dashboards and reports.
//!
//! Every function here is a pure computation over already-fetched
//! snapshots. Records whose timestamp is missing or unparsable are left out
//! of time-windowed figures but still count toward plain totals.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

use crate::models::dashboard::ResolvedRates;
use crate::models::emergency::{CaseType, Emergency, EmergencyStatus};
use crate::models::report::{
    BarangayCount, MonthBucket, RoleStats, StatusCounts, UserStatusCounts,
};
use crate::models::user::{User, UserRole, UserStatus};

/// Window used for the dashboard resolved rates.
pub const RESOLVED_RATE_WINDOW_DAYS: i64 = 30;

/// Barangays of Rizal, Nueva Ecija used when none are configured.
pub const DEFAULT_BARANGAYS: [&str; 11] = [
    "Adela",
    "Aguas",
    "Magsikap",
    "Malawaan",
    "Manoot",
    "Pitogo",
    "Rizal",
    "Salvacion",
    "San Pedro",
    "Sto Nino",
    "Rumbang",
];

/// Case types left out of the report breakdown.
pub const REPORT_EXCLUDED_CASE_TYPES: [CaseType; 2] = [CaseType::Typhoon, CaseType::Flood];

/// Percentage of matching emergencies in the window that are resolved.
///
/// Returns a value in `[0, 100]`, or 0 when nothing matches.
pub fn resolved_rate<'a, I>(
    emergencies: I,
    case_types: &[CaseType],
    window: Duration,
    now: DateTime<Utc>,
) -> f64
where
    I: IntoIterator<Item = &'a Emergency>,
{
    let cutoff = now - window;
    let mut total = 0u64;
    let mut resolved = 0u64;

    for emergency in emergencies {
        let Some(case_type) = emergency.case_type else {
            continue;
        };
        if !case_types.contains(&case_type) {
            continue;
        }
        match emergency.created_at {
            Some(created) if created >= cutoff => {}
            _ => continue,
        }
        total += 1;
        if emergency.is_resolved() {
            resolved += 1;
        }
    }

    if total == 0 {
        0.0
    } else {
        resolved as f64 / total as f64 * 100.0
    }
}

/// Rounds half away from zero to one decimal place.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Dashboard resolved rates for the standard case-type groups.
pub fn resolved_rates(emergencies: &[Emergency], now: DateTime<Utc>) -> ResolvedRates {
    let window = Duration::days(RESOLVED_RATE_WINDOW_DAYS);
    let rate = |types: &[CaseType]| round_to_tenth(resolved_rate(emergencies, types, window, now));

    ResolvedRates {
        medical: rate(&[CaseType::Medical]),
        fire: rate(&[CaseType::Fire]),
        crime: rate(&[CaseType::Crime]),
        disaster: rate(&CaseType::DISASTER_GROUP),
    }
}

/// Emergencies created in `year`, keyed by case-type label.
///
/// Every label is present, zero when unused.
pub fn yearly_case_type_histogram<'a, I>(emergencies: I, year: i32) -> BTreeMap<String, u64>
where
    I: IntoIterator<Item = &'a Emergency>,
{
    let mut histogram: BTreeMap<String, u64> = CaseType::ALL
        .iter()
        .map(|c| (c.display_label().to_string(), 0))
        .collect();

    for emergency in emergencies {
        let (Some(case_type), Some(created)) = (emergency.case_type, emergency.created_at) else {
            continue;
        };
        if created.year() == year {
            *histogram
                .entry(case_type.display_label().to_string())
                .or_insert(0) += 1;
        }
    }

    histogram
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Users per canonical barangay.
///
/// Matching is trimmed and case-insensitive. Users whose barangay matches
/// no entry are not counted anywhere. Repeated list entries are collapsed
/// so no user is counted twice.
pub fn barangay_counts(users: &[User], barangays: &[String]) -> Vec<BarangayCount> {
    let mut seen = HashSet::new();
    let canonical: Vec<&String> = barangays
        .iter()
        .filter(|b| seen.insert(normalize(b)))
        .collect();

    canonical
        .into_iter()
        .map(|barangay| BarangayCount {
            barangay: barangay.clone(),
            count: users.iter().filter(|u| u.in_barangay(barangay)).count() as u64,
        })
        .collect()
}

fn month_start(year: i32, month: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Shifts a (year, month) pair by `delta` months.
fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + (month as i32 - 1) + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// Emergency counts for the `months_back` calendar months ending with the
/// month of `as_of`, oldest first.
pub fn monthly_trend<'a, I>(emergencies: I, months_back: u32, as_of: DateTime<Utc>) -> Vec<MonthBucket>
where
    I: IntoIterator<Item = &'a Emergency>,
{
    let mut buckets: Vec<MonthBucket> = (0..months_back as i32)
        .rev()
        .filter_map(|back| {
            let (year, month) = shift_month(as_of.year(), as_of.month(), -back);
            let (next_year, next_month) = shift_month(year, month, 1);
            let start = month_start(year, month)?;
            let end = month_start(next_year, next_month)?;
            Some(MonthBucket {
                month: start.format("%b %Y").to_string(),
                start,
                end,
                count: 0,
            })
        })
        .collect();

    for emergency in emergencies {
        let Some(created) = emergency.created_at else {
            continue;
        };
        if let Some(bucket) = buckets
            .iter_mut()
            .find(|b| b.start <= created && created < b.end)
        {
            bucket.count += 1;
        }
    }

    buckets
}

/// Records whose linked user belongs to `barangay`.
///
/// Records without a resolvable user, or whose user has no barangay, are
/// excluded.
pub fn filter_by_barangay<'a, 'u, T, F>(records: &'a [T], owner: F, barangay: &str) -> Vec<&'a T>
where
    F: Fn(&T) -> Option<&'u User>,
{
    records
        .iter()
        .filter(|record| owner(*record).is_some_and(|user| user.in_barangay(barangay)))
        .collect()
}

pub fn status_counts<'a, I>(emergencies: I) -> StatusCounts
where
    I: IntoIterator<Item = &'a Emergency>,
{
    let mut counts = StatusCounts::default();
    for emergency in emergencies {
        match emergency.status {
            Some(EmergencyStatus::Pending) => counts.pending += 1,
            Some(EmergencyStatus::InProgress) => counts.in_progress += 1,
            Some(EmergencyStatus::Resolved) => counts.resolved += 1,
            _ => {}
        }
        if emergency.is_active {
            counts.active += 1;
        }
    }
    counts
}

/// Emergencies per case-type label, skipping `excluded` types.
pub fn case_type_stats<'a, I>(emergencies: I, excluded: &[CaseType]) -> BTreeMap<String, u64>
where
    I: IntoIterator<Item = &'a Emergency>,
{
    let mut stats: BTreeMap<String, u64> = CaseType::ALL
        .iter()
        .filter(|c| !excluded.contains(c))
        .map(|c| (c.display_label().to_string(), 0))
        .collect();

    for case_type in emergencies.into_iter().filter_map(|e| e.case_type) {
        if let Some(count) = stats.get_mut(case_type.display_label()) {
            *count += 1;
        }
    }
    stats
}

pub fn role_stats<'a, I>(users: I) -> RoleStats
where
    I: IntoIterator<Item = &'a User>,
{
    let mut stats = RoleStats::default();
    for user in users {
        match user.role {
            Some(UserRole::Citizen) => stats.citizen += 1,
            Some(UserRole::Admin) => stats.admin += 1,
            Some(UserRole::Responder) => stats.responder += 1,
            None => {}
        }
    }
    stats
}

pub fn user_status_counts<'a, I>(users: I) -> UserStatusCounts
where
    I: IntoIterator<Item = &'a User>,
{
    let mut counts = UserStatusCounts::default();
    for user in users {
        match user.status {
            Some(UserStatus::Active) => counts.active += 1,
            Some(UserStatus::Inactive) => counts.inactive += 1,
            None => {}
        }
    }
    counts
}

/// Emergencies created no earlier than `now - window`.
pub fn created_within<'a, I>(
    emergencies: I,
    window: Duration,
    now: DateTime<Utc>,
) -> impl Iterator<Item = &'a Emergency>
where
    I: IntoIterator<Item = &'a Emergency>,
{
    let cutoff = now - window;
    emergencies
        .into_iter()
        .filter(move |e| e.created_at.is_some_and(|created| created >= cutoff))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn emergency(
        case_type: CaseType,
        status: EmergencyStatus,
        created_at: Option<DateTime<Utc>>,
    ) -> Emergency {
        Emergency {
            id: format!("{}-{:?}", case_type, created_at),
            case_type: Some(case_type),
            status: Some(status),
            created_at,
            ..Default::default()
        }
    }

    fn user(id: &str, barangay: Option<&str>) -> User {
        User {
            id: id.to_string(),
            barangay: barangay.map(str::to_string),
            ..Default::default()
        }
    }

    fn barangays(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolved_rate_counts_window_only() {
        let list = vec![
            emergency(CaseType::Medical, EmergencyStatus::Resolved, Some(now() - Duration::days(2))),
            emergency(CaseType::Medical, EmergencyStatus::Pending, Some(now() - Duration::days(3))),
            emergency(CaseType::Medical, EmergencyStatus::Resolved, Some(now() - Duration::days(45))),
            emergency(CaseType::Fire, EmergencyStatus::Resolved, Some(now() - Duration::days(1))),
        ];
        let rate = resolved_rate(&list, &[CaseType::Medical], Duration::days(30), now());
        assert_eq!(rate, 50.0);
    }

    #[test]
    fn test_resolved_rate_zero_without_matches() {
        let list = vec![
            emergency(CaseType::Fire, EmergencyStatus::Resolved, None),
            emergency(CaseType::Crime, EmergencyStatus::Resolved, Some(now())),
        ];
        assert_eq!(
            resolved_rate(&list, &[CaseType::Fire], Duration::days(30), now()),
            0.0
        );
        assert_eq!(
            resolved_rate(&[], &[CaseType::Fire], Duration::days(30), now()),
            0.0
        );
    }

    #[test]
    fn test_resolved_rate_stays_in_range() {
        let statuses = EmergencyStatus::ALL;
        for size in 0..20usize {
            let list: Vec<Emergency> = (0..size)
                .map(|i| {
                    emergency(
                        CaseType::ALL[i % CaseType::ALL.len()],
                        statuses[i % statuses.len()],
                        Some(now() - Duration::days((i * 7) as i64)),
                    )
                })
                .collect();
            for types in [&CaseType::ALL[..], &CaseType::DISASTER_GROUP[..], &[CaseType::Crime][..]] {
                let rate = resolved_rate(&list, types, Duration::days(30), now());
                assert!((0.0..=100.0).contains(&rate), "rate {} out of range", rate);
            }
        }
    }

    #[test]
    fn test_resolved_rates_rounding_and_disaster_group() {
        let recent = Some(now() - Duration::days(1));
        let list = vec![
            emergency(CaseType::Typhoon, EmergencyStatus::Resolved, recent),
            emergency(CaseType::Flood, EmergencyStatus::Pending, recent),
            emergency(CaseType::Disaster, EmergencyStatus::Pending, recent),
        ];
        let rates = resolved_rates(&list, now());
        assert_eq!(rates.disaster, 33.3);
        assert_eq!(rates.medical, 0.0);
    }

    #[test]
    fn test_round_to_tenth() {
        assert_eq!(round_to_tenth(66.666), 66.7);
        assert_eq!(round_to_tenth(12.34), 12.3);
        assert_eq!(round_to_tenth(0.0), 0.0);
    }

    #[test]
    fn test_yearly_histogram() {
        let this_year = Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        let last_year = Some(Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap());
        let list = vec![
            emergency(CaseType::Medical, EmergencyStatus::Pending, this_year),
            emergency(CaseType::Medical, EmergencyStatus::Pending, this_year),
            emergency(CaseType::Typhoon, EmergencyStatus::Pending, this_year),
            emergency(CaseType::Fire, EmergencyStatus::Pending, last_year),
            emergency(CaseType::Crime, EmergencyStatus::Pending, None),
        ];
        let histogram = yearly_case_type_histogram(&list, 2024);
        assert_eq!(histogram.len(), 6);
        assert_eq!(histogram["Medical"], 2);
        assert_eq!(histogram["Typhoon"], 1);
        assert_eq!(histogram["Fire"], 0);
        assert_eq!(histogram["Crime"], 0);
    }

    #[test]
    fn test_barangay_counts_case_insensitive() {
        let users = vec![
            user("1", Some("aguas")),
            user("2", Some("  Aguas ")),
            user("3", Some("San Pedro")),
            user("4", Some("Elsewhere")),
            user("5", None),
        ];
        let counts = barangay_counts(&users, &barangays(&["Aguas", "San Pedro", "Rizal"]));
        assert_eq!(
            counts,
            vec![
                BarangayCount { barangay: "Aguas".into(), count: 2 },
                BarangayCount { barangay: "San Pedro".into(), count: 1 },
                BarangayCount { barangay: "Rizal".into(), count: 0 },
            ]
        );
    }

    #[test]
    fn test_barangay_counts_sum_bounded_by_users() {
        let users = vec![
            user("1", Some("Adela")),
            user("2", Some("ADELA")),
            user("3", Some("Manoot")),
            user("4", Some("Unknown")),
        ];
        let list = barangays(&["Adela", "adela ", "Manoot"]);
        let counts = barangay_counts(&users, &list);
        let sum: u64 = counts.iter().map(|c| c.count).sum();
        assert!(sum <= users.len() as u64);
        assert_eq!(sum, 3);
        assert_eq!(counts.len(), 2);

        let all_match = vec![user("1", Some("Adela")), user("2", Some("manoot"))];
        let sum: u64 = barangay_counts(&all_match, &list).iter().map(|c| c.count).sum();
        assert_eq!(sum, all_match.len() as u64);
    }

    #[test]
    fn test_monthly_trend_buckets() {
        let as_of = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let at = |y, m, d| Some(Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap());
        let list = vec![
            emergency(CaseType::Fire, EmergencyStatus::Pending, at(2023, 10, 1)),
            emergency(CaseType::Fire, EmergencyStatus::Pending, at(2023, 12, 31)),
            emergency(CaseType::Fire, EmergencyStatus::Pending, at(2024, 1, 1)),
            emergency(CaseType::Fire, EmergencyStatus::Pending, at(2024, 3, 31)),
            emergency(CaseType::Fire, EmergencyStatus::Pending, at(2023, 9, 30)),
            emergency(CaseType::Fire, EmergencyStatus::Pending, None),
        ];
        let trend = monthly_trend(&list, 6, as_of);

        let labels: Vec<&str> = trend.iter().map(|b| b.month.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Oct 2023", "Nov 2023", "Dec 2023", "Jan 2024", "Feb 2024", "Mar 2024"]
        );
        let counts: Vec<u64> = trend.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 0, 1, 1, 0, 1]);
    }

    #[test]
    fn test_monthly_trend_contiguous() {
        let as_of = Utc.with_ymd_and_hms(2024, 1, 31, 23, 0, 0).unwrap();
        for months in [0u32, 1, 6, 13, 25] {
            let trend = monthly_trend(&[], months, as_of);
            assert_eq!(trend.len(), months as usize);
            for pair in trend.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
            if let Some(last) = trend.last() {
                assert!(last.start <= as_of && as_of < last.end);
            }
        }
    }

    #[test]
    fn test_monthly_trend_counts_match_windows() {
        let as_of = Utc.with_ymd_and_hms(2024, 8, 20, 0, 0, 0).unwrap();
        let list: Vec<Emergency> = (0..120)
            .map(|i| {
                emergency(
                    CaseType::Medical,
                    EmergencyStatus::Pending,
                    Some(as_of - Duration::days(i * 3)),
                )
            })
            .collect();
        let trend = monthly_trend(&list, 6, as_of);
        for bucket in &trend {
            let expected = list
                .iter()
                .filter(|e| {
                    let c = e.created_at.unwrap();
                    bucket.start <= c && c < bucket.end
                })
                .count() as u64;
            assert_eq!(bucket.count, expected);
        }
    }

    #[test]
    fn test_filter_by_barangay() {
        let users: HashMap<String, User> = [
            ("u1".to_string(), user("u1", Some("Pitogo"))),
            ("u2".to_string(), user("u2", Some("Rizal"))),
            ("u3".to_string(), user("u3", None)),
        ]
        .into_iter()
        .collect();

        let records = vec![
            Emergency { id: "e1".into(), user_id: Some("u1".into()), ..Default::default() },
            Emergency { id: "e2".into(), user_id: Some("u2".into()), ..Default::default() },
            Emergency { id: "e3".into(), user_id: Some("u3".into()), ..Default::default() },
            Emergency { id: "e4".into(), user_id: Some("ghost".into()), ..Default::default() },
            Emergency { id: "e5".into(), user_id: None, ..Default::default() },
        ];

        let filtered = filter_by_barangay(
            &records,
            |e| e.user_id.as_deref().and_then(|id| users.get(id)),
            " pitogo ",
        );
        let ids: Vec<&str> = filtered.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e1"]);
    }

    #[test]
    fn test_status_counts() {
        let mut active = emergency(CaseType::Fire, EmergencyStatus::Pending, None);
        active.is_active = true;
        let list = vec![
            active,
            emergency(CaseType::Fire, EmergencyStatus::InProgress, None),
            emergency(CaseType::Fire, EmergencyStatus::Resolved, None),
            emergency(CaseType::Fire, EmergencyStatus::Monitoring, None),
        ];
        let counts = status_counts(&list);
        assert_eq!(
            counts,
            StatusCounts { pending: 1, in_progress: 1, resolved: 1, active: 1 }
        );
    }

    #[test]
    fn test_case_type_stats_excludes() {
        let list = vec![
            emergency(CaseType::Typhoon, EmergencyStatus::Pending, None),
            emergency(CaseType::Fire, EmergencyStatus::Pending, None),
        ];
        let stats = case_type_stats(&list, &REPORT_EXCLUDED_CASE_TYPES);
        assert!(!stats.contains_key("Typhoon"));
        assert!(!stats.contains_key("Flood"));
        assert_eq!(stats["Fire"], 1);
        assert_eq!(stats["Disaster"], 0);
    }

    #[test]
    fn test_role_and_status_stats() {
        let users = vec![
            User { role: Some(UserRole::Admin), status: Some(UserStatus::Active), ..Default::default() },
            User { role: Some(UserRole::Citizen), status: Some(UserStatus::Inactive), ..Default::default() },
            User { role: Some(UserRole::Citizen), status: None, ..Default::default() },
            User::default(),
        ];
        assert_eq!(
            role_stats(&users),
            RoleStats { citizen: 2, admin: 1, responder: 0 }
        );
        assert_eq!(
            user_status_counts(&users),
            UserStatusCounts { active: 1, inactive: 1 }
        );
    }

    #[test]
    fn test_created_within() {
        let list = vec![
            emergency(CaseType::Fire, EmergencyStatus::Pending, Some(now() - Duration::hours(2))),
            emergency(CaseType::Fire, EmergencyStatus::Pending, Some(now() - Duration::hours(30))),
            emergency(CaseType::Fire, EmergencyStatus::Pending, None),
        ];
        assert_eq!(created_within(&list, Duration::hours(24), now()).count(), 1);
    }
}
