//! Client visit recency monitor.
//!
//! Finds each client's most recent completed visit and, on every multiple of
//! the seller interval, reminds the owning seller. On every multiple of the
//! admin interval, escalates to all active admins as well.
//!
//! Only active users are notified. A client whose owning seller is no longer
//! active gets no reminder, but the admin escalation still fires for it.
//!
//! # Cadence
//!
//! The modulo gates fire once per interval boundary only when the job runs
//! exactly once per day. Running it more often repeats notifications on a
//! boundary day; skipping a day can skip a boundary entirely. Nothing is
//! persisted between runs to compensate.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::data_sources::{EntityReader, NotificationSink};
use crate::error::MonitorError;
use crate::model::{
    NotificationKind, NotificationRequest, Role, TargetUser, VisitReport, VisitWithClient,
};
use crate::monitor::dispatch::{broadcast_requests, dispatch_all};
use crate::monitor::run::{Run, RunPhase};

const MS_PER_DAY: i64 = 86_400_000;

/// Staleness tiers, in days since the last completed visit.
///
/// Both intervals assume a once-per-day invocation cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    /// The owning seller is reminded on every multiple of this many days.
    pub seller_interval_days: i64,

    /// All active admins are alerted on every multiple of this many days.
    pub admin_interval_days: i64,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            seller_interval_days: 30,
            admin_interval_days: 90,
        }
    }
}

impl StalenessPolicy {
    pub fn seller_due(&self, days: i64) -> bool {
        on_boundary(days, self.seller_interval_days)
    }

    pub fn admin_due(&self, days: i64) -> bool {
        on_boundary(days, self.admin_interval_days)
    }
}

fn on_boundary(days: i64, interval: i64) -> bool {
    interval > 0 && days >= interval && days % interval == 0
}

/// The most recent completed visit of one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastVisit {
    pub last_visit_at: DateTime<Utc>,
    pub seller_id: String,
    pub client_name: String,
}

/// Keep, for each client, the completed visit with the latest `scheduled_at`.
///
/// Input order does not matter. Clients without visits are simply absent.
pub fn last_visits(visits: &[VisitWithClient]) -> BTreeMap<String, LastVisit> {
    let mut latest: BTreeMap<String, LastVisit> = BTreeMap::new();

    for visit in visits {
        let newer = latest
            .get(&visit.client_id)
            .is_none_or(|known| visit.scheduled_at > known.last_visit_at);

        if newer {
            latest.insert(
                visit.client_id.clone(),
                LastVisit {
                    last_visit_at: visit.scheduled_at,
                    seller_id: visit.seller_id.clone(),
                    client_name: visit.client_name.clone(),
                },
            );
        }
    }

    latest
}

/// Whole days elapsed between `last` and `now`, rounded down.
pub fn days_since(last: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - last).num_milliseconds().div_euclid(MS_PER_DAY)
}

fn seller_reminder(seller_id: &str, client_name: &str, days: i64) -> NotificationRequest {
    NotificationRequest {
        target_user_id: seller_id.to_string(),
        kind: NotificationKind::Warning,
        title: "Cliente sem visita".to_string(),
        message: format!("O cliente {client_name} está há {days} dias sem visita."),
    }
}

/// Every notification a visit check should send, given its snapshot.
///
/// `sellers` are the active sellers; reminders for anyone else are dropped.
pub fn evaluate_visits(
    last: &BTreeMap<String, LastVisit>,
    admins: &[TargetUser],
    sellers: &[TargetUser],
    now: DateTime<Utc>,
    policy: &StalenessPolicy,
) -> Vec<NotificationRequest> {
    let active_sellers: HashSet<&str> = sellers.iter().map(|s| s.auth_user_id.as_str()).collect();
    let mut requests = Vec::new();

    for visit in last.values() {
        let days = days_since(visit.last_visit_at, now);

        if policy.seller_due(days) {
            if active_sellers.contains(visit.seller_id.as_str()) {
                requests.push(seller_reminder(&visit.seller_id, &visit.client_name, days));
            } else {
                debug!(seller_id = %visit.seller_id, days, "Seller not active, reminder skipped");
            }
        }

        if policy.admin_due(days) {
            requests.extend(broadcast_requests(
                admins,
                NotificationKind::Alert,
                &format!("Cliente sem visita há {days} dias"),
                &format!(
                    "ALERTA: o cliente {} está há {} dias sem visita.",
                    visit.client_name, days
                ),
            ));
        }
    }

    requests
}

/// Run one visit recency check using the run's start time as "now".
///
/// Fails when visits, admins or sellers cannot be read; nothing is sent in that case.
#[instrument(skip_all)]
pub async fn check_visits(
    reader: &dyn EntityReader,
    sink: &dyn NotificationSink,
    policy: &StalenessPolicy,
    run: &mut Run,
) -> Result<VisitReport, MonitorError> {
    let result = run_visit_check(reader, sink, policy, run).await;
    run.finish(result)
}

async fn run_visit_check(
    reader: &dyn EntityReader,
    sink: &dyn NotificationSink,
    policy: &StalenessPolicy,
    run: &mut Run,
) -> Result<VisitReport, MonitorError> {
    run.advance(RunPhase::Reading);
    let visits = reader
        .list_completed_visits_with_client()
        .await
        .map_err(MonitorError::read("visits"))?;
    let admins = reader
        .list_active_users_by_role(Role::Admin)
        .await
        .map_err(MonitorError::read("admin users"))?;
    let sellers = reader
        .list_active_users_by_role(Role::Seller)
        .await
        .map_err(MonitorError::read("sellers"))?;

    run.advance(RunPhase::Evaluating);
    let last = last_visits(&visits);
    let requests = evaluate_visits(&last, &admins, &sellers, run.started_at(), policy);

    run.advance(RunPhase::Dispatching);
    let report = VisitReport {
        clients_checked: last.len(),
        notifications_created: dispatch_all(sink, &requests).await,
    };

    info!(
        visits_read = visits.len(),
        clients_checked = report.clients_checked,
        notifications_created = report.notifications_created,
        notifications_attempted = requests.len(),
        "Visit check completed"
    );

    Ok(report)
}
