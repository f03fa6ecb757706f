//! Notification feed built from recent alerts and responder assignments.
//!
//! Notifications are not stored. Identifiers are derived from the data, so
//! the read state kept in the session is a best-effort marker: editing or
//! deleting old alerts can make a read notification disappear or reappear.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::emergency::Emergency;
use crate::models::emergency_alert::{AlertList, EmergencyAlert};
use crate::models::notification::{
    alert_notification_id, responder_notification_id, AlertNotification, Notification,
    ResponderNotification,
};
use crate::models::recent_ids::RecentIdSet;
use crate::models::user::User;

/// Alerts scanned for person responses.
pub const RECENT_ALERT_LIMIT: usize = 20;
/// Emergencies scanned for responders.
pub const RECENT_EMERGENCY_LIMIT: usize = 50;
/// Maximum entries returned by the feed.
pub const FEED_LIMIT: usize = 50;

fn user_name(user: Option<&User>, fallback: Option<&str>, id: &str) -> String {
    user.map(|u| u.full_name.trim())
        .filter(|name| !name.is_empty())
        .or(fallback.map(str::trim).filter(|name| !name.is_empty()))
        .unwrap_or(id)
        .to_string()
}

/// Every notification derivable from the given snapshots, unsorted and uncapped.
///
/// `alerts` and `emergencies` are expected to be the most recent records,
/// newest first.
pub fn collect(
    alerts: &[EmergencyAlert],
    emergencies: &[Emergency],
    users: &HashMap<String, User>,
    read: &RecentIdSet,
) -> Vec<Notification> {
    let mut out = Vec::new();

    for alert in alerts {
        for list in AlertList::ALL {
            for person in alert.list(list) {
                let id = alert_notification_id(&alert.id, list, &person.user_id);
                out.push(Notification::Alert(AlertNotification {
                    read: read.contains(&id),
                    id,
                    alert_id: alert.id.clone(),
                    alert_type: alert.emergency_type.clone(),
                    message: alert.emergency_descriptions.clone(),
                    list,
                    list_label: list.display_label(),
                    user_id: person.user_id.clone(),
                    user_name: user_name(
                        users.get(&person.user_id),
                        person.full_name.as_deref(),
                        &person.user_id,
                    ),
                    timestamp: person.date_created.or(alert.date_created),
                }));
            }
        }
    }

    for emergency in emergencies {
        for responder in &emergency.responders {
            let id = responder_notification_id(&emergency.id, &responder.responder_id);
            out.push(Notification::Responder(ResponderNotification {
                read: read.contains(&id),
                id,
                emergency_id: emergency.id.clone(),
                emergency_type: emergency.case_type,
                responder_id: responder.responder_id.clone(),
                responder_name: user_name(
                    users.get(&responder.responder_id),
                    None,
                    &responder.responder_id,
                ),
                status: responder.status,
                arrived: responder.is_arrived,
                timestamp: responder.response_datetime,
            }));
        }
    }

    out
}

/// Newest first; undated entries last, in their original order.
fn newest_first(a: &Notification, b: &Notification) -> Ordering {
    match (a.timestamp(), b.timestamp()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// The feed shown to the admin: sorted and capped at [`FEED_LIMIT`].
pub fn build_feed(
    alerts: &[EmergencyAlert],
    emergencies: &[Emergency],
    users: &HashMap<String, User>,
    read: &RecentIdSet,
) -> Vec<Notification> {
    let mut feed = collect(alerts, emergencies, users, read);
    feed.sort_by(newest_first);
    feed.truncate(FEED_LIMIT);
    feed
}

/// Identifiers of all current notifications (uncapped).
pub fn notification_ids(alerts: &[EmergencyAlert], emergencies: &[Emergency]) -> Vec<String> {
    let alert_ids = alerts.iter().flat_map(|alert| {
        AlertList::ALL.into_iter().flat_map(move |list| {
            alert
                .list(list)
                .iter()
                .map(move |p| alert_notification_id(&alert.id, list, &p.user_id))
        })
    });
    let responder_ids = emergencies.iter().flat_map(|emergency| {
        emergency
            .responders
            .iter()
            .map(move |r| responder_notification_id(&emergency.id, &r.responder_id))
    });
    alert_ids.chain(responder_ids).collect()
}

/// Number of current notifications not yet marked read.
pub fn unread_count(
    alerts: &[EmergencyAlert],
    emergencies: &[Emergency],
    read: &RecentIdSet,
) -> usize {
    notification_ids(alerts, emergencies)
        .iter()
        .filter(|id| !read.contains(id))
        .count()
}

/// Marks every current notification as read.
pub fn mark_all_read(alerts: &[EmergencyAlert], emergencies: &[Emergency], read: &mut RecentIdSet) {
    read.extend(notification_ids(alerts, emergencies));
}
