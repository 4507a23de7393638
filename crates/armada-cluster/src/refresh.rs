//! The health and coordination refresh cycle.
//!
//! [`evaluate`] is the pure half: given one snapshot it produces a
//! [`ClusterReport`] with every derived figure and the events the
//! snapshot implies. [`RefreshCycle`] is the stateful half: it reads the
//! snapshot from a [`ClusterStore`], evaluates it, and writes the results
//! back. Neither ever changes the persisted cluster status; the suggested
//! status is reported and left to an operator or a higher layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::coordination::{
    check_coordination_status, detect_role_conflicts, generate_failover_plan,
    plan_role_assignment, CoordinationIssue, CoordinationReport, CoordinationStatus,
    FailoverPlan, Role, RoleAssignment, RoleConflict,
};
use crate::events::{ClusterEvent, ClusterMetric, EventSeverity, EventType};
use crate::health::{assess, refresh_node_health, HealthReport};
use crate::metrics::{collect_system_metrics, performance_metrics_with_score, PerformanceMetrics, SystemMetrics};
use crate::store::ClusterStore;
use crate::{Cluster, ClusterError, ClusterStatus, HealthStatus, Node, NodeStatus};

/// Default number of snapshot/evaluate/assign rounds before giving up on
/// a contested role assignment.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Health of one node before and after the refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeHealth {
    pub node_id: String,
    pub status: NodeStatus,
    pub previous: HealthStatus,
    pub health: HealthStatus,
}

impl NodeHealth {
    pub fn changed(&self) -> bool {
        self.previous != self.health
    }
}

/// Everything one evaluation derives from a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterReport {
    pub cluster_id: String,
    pub evaluated_at: DateTime<Utc>,
    /// Shared by every event this evaluation produced.
    pub correlation_id: Uuid,
    /// Status stored on the cluster row when the snapshot was taken.
    pub current_status: ClusterStatus,
    pub health: HealthReport,
    pub node_health: Vec<NodeHealth>,
    pub coordination: CoordinationReport,
    pub failover: FailoverPlan,
    pub role_assignment: Option<RoleAssignment>,
    pub role_conflicts: Vec<RoleConflict>,
    pub system: SystemMetrics,
    pub performance: PerformanceMetrics,
    pub events: Vec<ClusterEvent>,
    pub samples: Vec<ClusterMetric>,
}

impl ClusterReport {
    /// True if the score suggests a status other than the stored one.
    pub fn status_change_suggested(&self) -> bool {
        self.health.suggested_status != self.current_status
    }
}

/// Position of an in-service status on the health ladder, worst highest.
/// Statuses outside normal service have none.
fn service_level(status: ClusterStatus) -> Option<u8> {
    match status {
        ClusterStatus::Active => Some(0),
        ClusterStatus::Degraded => Some(1),
        ClusterStatus::Maintenance => Some(2),
        ClusterStatus::Offline => Some(3),
        ClusterStatus::Initializing | ClusterStatus::Decommissioning => None,
    }
}

fn health_event(
    cluster: &Cluster,
    report: &HealthReport,
    at: DateTime<Utc>,
) -> Option<ClusterEvent> {
    let current = service_level(cluster.status)?;
    let suggested = service_level(report.suggested_status)?;
    let (event_type, severity, title) = match suggested.cmp(&current) {
        std::cmp::Ordering::Equal => return None,
        std::cmp::Ordering::Greater => {
            let severity = if report.suggested_status == ClusterStatus::Offline {
                EventSeverity::Critical
            } else {
                EventSeverity::Warning
            };
            (EventType::HealthDegraded, severity, "cluster health degraded")
        }
        std::cmp::Ordering::Less => (EventType::HealthRecovered, EventSeverity::Info, "cluster health recovered"),
    };
    Some(
        ClusterEvent::new(&cluster.id, event_type, severity, title, at)
            .with_description(format!(
                "health score {:.2} suggests {} (currently {})",
                report.score, report.suggested_status, cluster.status
            ))
            .with_detail("score", format!("{:.4}", report.score))
            .with_detail("from", cluster.status)
            .with_detail("to", report.suggested_status),
    )
}

/// Tag recording the cluster status an event was raised under.
fn status_tag(status: ClusterStatus) -> String {
    format!("status:{status}")
}

fn issue_kind(issue: &CoordinationIssue) -> &'static str {
    match issue {
        CoordinationIssue::NoPrimary => "no_primary",
        CoordinationIssue::NoCoordinator => "no_coordinator",
        CoordinationIssue::InsufficientOnline { .. } => "insufficient_online",
    }
}

/// Evaluates one snapshot.
///
/// Node health is recomputed on a private copy first, so the score,
/// election and metrics all see current health. The caller's slice is
/// left untouched.
pub fn evaluate(cluster: &Cluster, nodes: &[Node], at: DateTime<Utc>) -> ClusterReport {
    let correlation_id = Uuid::new_v4();

    let mut refreshed = nodes.to_vec();
    refresh_node_health(&mut refreshed);
    let node_health: Vec<NodeHealth> = nodes
        .iter()
        .zip(&refreshed)
        .map(|(before, after)| NodeHealth {
            node_id: after.id.clone(),
            status: after.status,
            previous: before.health,
            health: after.health,
        })
        .collect();

    let health = assess(&refreshed);
    let coordination = check_coordination_status(cluster, &refreshed);
    let failover = generate_failover_plan(&refreshed);
    let role_assignment = plan_role_assignment(&refreshed);
    let role_conflicts = detect_role_conflicts(&refreshed);
    let system = collect_system_metrics(&refreshed);
    let performance = performance_metrics_with_score(&refreshed, health.score);

    let mut events = Vec::new();
    if let Some(event) = health_event(cluster, &health, at) {
        events.push(event.correlated_with(correlation_id));
    }

    let issue_severity = match coordination.status {
        CoordinationStatus::Critical => EventSeverity::Error,
        _ => EventSeverity::Warning,
    };
    let mut primary_cause = None;
    let mut coordinator_cause = None;
    for issue in &coordination.issues {
        let event = ClusterEvent::new(
            &cluster.id,
            EventType::CoordinationIssue,
            issue_severity,
            issue.to_string(),
            at,
        )
        .with_detail("issue", issue_kind(issue))
        .correlated_with(correlation_id);
        match issue {
            CoordinationIssue::NoPrimary => primary_cause = Some(events.len()),
            CoordinationIssue::NoCoordinator => coordinator_cause = Some(events.len()),
            CoordinationIssue::InsufficientOnline { .. } => {}
        }
        events.push(event);
    }

    for conflict in &role_conflicts {
        let event = ClusterEvent::new(
            &cluster.id,
            EventType::RoleConflict,
            EventSeverity::Error,
            format!("{} nodes hold the {} role", conflict.node_ids.len(), conflict.role),
            at,
        )
        .with_detail("role", conflict.role)
        .with_detail("nodes", conflict.node_ids.join(","))
        .correlated_with(correlation_id);
        match conflict.role {
            Role::Primary => primary_cause = Some(events.len()),
            Role::Coordinator => coordinator_cause = Some(events.len()),
        }
        events.push(event);
    }

    if let Some(assignment) = &role_assignment {
        let elections = [
            (assignment.changes_primary(), &assignment.primary, EventType::PrimaryElected, Role::Primary, primary_cause),
            (
                assignment.changes_coordinator(),
                &assignment.coordinator,
                EventType::CoordinatorElected,
                Role::Coordinator,
                coordinator_cause,
            ),
        ];
        for (changed, node_id, event_type, role, cause) in elections {
            let Some(node_id) = node_id.as_ref().filter(|_| changed) else {
                continue;
            };
            let mut event = ClusterEvent::new(
                &cluster.id,
                event_type,
                EventSeverity::Info,
                format!("{node_id} elected {role}"),
                at,
            )
            .for_node(node_id.as_str())
            .correlated_with(correlation_id);
            if let Some(parent) = cause.and_then(|i| events.get(i)) {
                event = event.caused_by(parent);
            }
            events.push(event);
        }
    }

    let tag = status_tag(cluster.status);
    let events: Vec<ClusterEvent> = events
        .into_iter()
        .map(|e| e.with_tag(tag.as_str()))
        .collect();

    let mut samples = system.to_samples(&cluster.id, at);
    samples.extend(performance.to_samples(&cluster.id, at));

    debug!(
        cluster = %cluster.id,
        score = health.score,
        suggested = %health.suggested_status,
        coordination = %coordination.status,
        events = events.len(),
        "evaluated cluster"
    );

    ClusterReport {
        cluster_id: cluster.id.clone(),
        evaluated_at: at,
        correlation_id,
        current_status: cluster.status,
        health,
        node_health,
        coordination,
        failover,
        role_assignment,
        role_conflicts,
        system,
        performance,
        events,
        samples,
    }
}

/// Result of one [`RefreshCycle::run`].
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub report: ClusterReport,
    /// Whether the report's role assignment (if any) reached the store.
    pub roles_applied: bool,
    /// Snapshot/evaluate rounds used.
    pub attempts: u32,
}

/// Reads, evaluates and writes back one cluster.
#[derive(Debug, Clone, Copy)]
pub struct RefreshCycle {
    max_attempts: u32,
}

impl Default for RefreshCycle {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RefreshCycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many rounds to try when the role assignment keeps losing
    /// the compare-and-swap. At least one round always runs.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn run<S: ClusterStore + ?Sized>(
        &self,
        store: &S,
        cluster_id: &str,
    ) -> Result<RefreshOutcome, ClusterError> {
        self.run_at(store, cluster_id, Utc::now())
    }

    /// Runs one refresh stamped with `at`.
    ///
    /// A lost role assignment is retried against a fresh snapshot. When
    /// every attempt loses, the cycle still records health and metrics,
    /// drops the election events that did not happen and records the
    /// conflict instead.
    pub fn run_at<S: ClusterStore + ?Sized>(
        &self,
        store: &S,
        cluster_id: &str,
        at: DateTime<Utc>,
    ) -> Result<RefreshOutcome, ClusterError> {
        let mut attempts = 0;
        let (mut report, roles_applied) = loop {
            attempts += 1;
            let snapshot = store.snapshot(cluster_id)?;
            let report = evaluate(&snapshot.cluster, &snapshot.nodes, at);

            let Some(assignment) = &report.role_assignment else {
                break (report, true);
            };
            match store.assign_roles(cluster_id, assignment) {
                Ok(()) => break (report, true),
                Err(err) if err.is_retryable() && attempts < self.max_attempts => {
                    warn!(cluster = cluster_id, attempt = attempts, error = %err, "role assignment lost, retrying");
                }
                Err(err) if err.is_retryable() => {
                    warn!(cluster = cluster_id, attempts, error = %err, "giving up on role assignment");
                    break (report, false);
                }
                Err(err) => return Err(err),
            }
        };

        if !roles_applied {
            report.events.retain(|e| {
                !matches!(e.event_type, EventType::PrimaryElected | EventType::CoordinatorElected)
            });
            report.events.push(
                ClusterEvent::new(
                    cluster_id,
                    EventType::RoleConflict,
                    EventSeverity::Warning,
                    "role assignment lost to a concurrent refresh",
                    at,
                )
                .with_detail("attempts", attempts)
                .with_tag(status_tag(report.current_status))
                .correlated_with(report.correlation_id),
            );
        }

        store.update_cluster_health(cluster_id, report.health.score, at)?;
        for event in &report.events {
            store.append_event(event.clone())?;
        }
        for sample in &report.samples {
            store.append_metric(sample.clone())?;
        }

        if report.status_change_suggested() {
            info!(
                cluster = cluster_id,
                current = %report.current_status,
                suggested = %report.health.suggested_status,
                score = report.health.score,
                "cluster status change suggested"
            );
        }
        info!(
            cluster = cluster_id,
            score = report.health.score,
            coordination = %report.coordination.status,
            roles_applied,
            attempts,
            "refresh complete"
        );

        Ok(RefreshOutcome {
            report,
            roles_applied,
            attempts,
        })
    }
}
