//! Node and cluster health scoring.
//!
//! A node's health is the worst of three resource ratios against its
//! declared capacity. A cluster's score folds the node set into one number
//! in `[0.0, 1.0]`, and the score maps onto an advisory cluster status.
//! Nothing here writes status back; the caller decides whether to act.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{ClusterStatus, HealthStatus, Node, NodeStatus, Resources};

/// Per-resource warning/critical ratio thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioThresholds {
    pub warning: f64,
    pub critical: f64,
}

impl RatioThresholds {
    /// Ratios strictly above a threshold trip it.
    pub fn classify(&self, ratio: f64) -> HealthStatus {
        if ratio > self.critical {
            HealthStatus::Critical
        } else if ratio > self.warning {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        }
    }
}

pub const CPU_THRESHOLDS: RatioThresholds = RatioThresholds {
    warning: 0.7,
    critical: 0.9,
};

pub const MEMORY_THRESHOLDS: RatioThresholds = RatioThresholds {
    warning: 0.8,
    critical: 0.9,
};

pub const STORAGE_THRESHOLDS: RatioThresholds = RatioThresholds {
    warning: 0.8,
    critical: 0.95,
};

const WARNING_PENALTY: f64 = 0.1;
const CRITICAL_PENALTY: f64 = 0.3;
const OFFLINE_PENALTY: f64 = 0.5;

/// Reported-metric percentages above which a recommendation is emitted.
const CPU_PERCENT_ALERT: f64 = 80.0;
const MEMORY_PERCENT_ALERT: f64 = 85.0;
const DISK_PERCENT_ALERT: f64 = 90.0;

/// Classifies a node from its usage/capacity ratios.
///
/// Zero capacity is not special-cased: `0/0` is NaN and trips nothing,
/// while non-zero usage over zero capacity is infinite and reads critical.
/// Callers that want other behaviour must guard capacity upstream.
pub fn classify_resources(capacity: &Resources, usage: &Resources) -> HealthStatus {
    let cpu = CPU_THRESHOLDS.classify(usage.cpu / capacity.cpu);
    let memory = MEMORY_THRESHOLDS.classify(usage.memory / capacity.memory);
    let storage = STORAGE_THRESHOLDS.classify(usage.storage / capacity.storage);
    cpu.worst(memory).worst(storage)
}

/// Computes a node's health status from its declared capacity and usage.
pub fn node_health_status(node: &Node) -> HealthStatus {
    classify_resources(&node.capacity, &node.usage)
}

/// Recomputes the `health` field of every node in an owned snapshot.
///
/// Offline nodes get `Unknown`: nothing they report is current.
pub fn refresh_node_health(nodes: &mut [Node]) {
    for node in nodes.iter_mut() {
        node.health = if node.is_offline() {
            HealthStatus::Unknown
        } else {
            node_health_status(node)
        };
        trace!(node = %node.id, health = %node.health, "refreshed node health");
    }
}

/// Node counts by lifecycle status and, for online nodes, by health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealthCounts {
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    pub online_healthy: usize,
    pub online_warning: usize,
    pub online_critical: usize,
    pub online_unknown: usize,
}

impl HealthCounts {
    pub fn tally(nodes: &[Node]) -> Self {
        let mut counts = HealthCounts {
            total: nodes.len(),
            ..Default::default()
        };
        for node in nodes {
            match node.status {
                NodeStatus::Online => {
                    counts.online += 1;
                    match node.health {
                        HealthStatus::Healthy => counts.online_healthy += 1,
                        HealthStatus::Warning => counts.online_warning += 1,
                        HealthStatus::Critical => counts.online_critical += 1,
                        HealthStatus::Unknown => counts.online_unknown += 1,
                    }
                }
                NodeStatus::Offline => counts.offline += 1,
                _ => {}
            }
        }
        counts
    }

    /// Online nodes whose health has actually been measured.
    pub fn online_known(&self) -> usize {
        self.online - self.online_unknown
    }
}

/// Computes the cluster health score in `[0.0, 1.0]`.
///
/// The base is the share of nodes that are online with a measured health.
/// Online warning and critical nodes then cost 0.1 and 0.3 of their share,
/// and offline nodes cost 0.5 of theirs regardless of their health field.
/// Online nodes with unknown health count for nothing. An empty set is 0.0.
pub fn cluster_health_score(nodes: &[Node]) -> f64 {
    score_from_counts(&HealthCounts::tally(nodes))
}

fn score_from_counts(counts: &HealthCounts) -> f64 {
    if counts.total == 0 {
        return 0.0;
    }
    let total = counts.total as f64;
    let base = counts.online_known() as f64 / total;
    let penalty = WARNING_PENALTY * counts.online_warning as f64 / total
        + CRITICAL_PENALTY * counts.online_critical as f64 / total
        + OFFLINE_PENALTY * counts.offline as f64 / total;
    (base - penalty).clamp(0.0, 1.0)
}

/// Maps a health score to the cluster status it suggests.
pub fn cluster_status_for_score(score: f64) -> ClusterStatus {
    if score >= 0.9 {
        ClusterStatus::Active
    } else if score >= 0.7 {
        ClusterStatus::Degraded
    } else if score >= 0.3 {
        ClusterStatus::Maintenance
    } else {
        ClusterStatus::Offline
    }
}

/// Builds remediation hints for the node set, one per triggered condition.
pub fn health_recommendations(nodes: &[Node]) -> Vec<String> {
    let mut recommendations = Vec::new();
    let online: Vec<&Node> = nodes.iter().filter(|n| n.is_online()).collect();

    let offline = nodes.iter().filter(|n| n.is_offline()).count();
    if offline > 0 {
        recommendations.push(format!(
            "{offline} node(s) offline: investigate connectivity and restart failed nodes"
        ));
    }

    let hot_cpu = online
        .iter()
        .filter(|n| n.metrics.cpu_usage_percent > CPU_PERCENT_ALERT)
        .count();
    if hot_cpu > 0 {
        recommendations.push(format!(
            "{hot_cpu} node(s) above {CPU_PERCENT_ALERT}% CPU usage: scale out or rebalance workloads"
        ));
    }

    let hot_memory = online
        .iter()
        .filter(|n| n.metrics.memory_usage_percent > MEMORY_PERCENT_ALERT)
        .count();
    if hot_memory > 0 {
        recommendations.push(format!(
            "{hot_memory} node(s) above {MEMORY_PERCENT_ALERT}% memory usage: add memory or move tenants"
        ));
    }

    let full_disk = online
        .iter()
        .filter(|n| n.metrics.disk_usage_percent > DISK_PERCENT_ALERT)
        .count();
    if full_disk > 0 {
        recommendations.push(format!(
            "{full_disk} node(s) above {DISK_PERCENT_ALERT}% disk usage: expand storage or purge old data"
        ));
    }

    if !online.iter().any(|n| n.is_primary) {
        recommendations.push("no online primary node: elect a new primary".to_string());
    }

    if !online.iter().any(|n| n.is_coordinator) {
        recommendations.push("no online coordinator node: assign a coordinator".to_string());
    }

    recommendations
}

/// Everything the health pass says about one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub score: f64,
    pub suggested_status: ClusterStatus,
    pub counts: HealthCounts,
    pub recommendations: Vec<String>,
}

/// Runs the full health pass over a snapshot whose `health` fields are current.
pub fn assess(nodes: &[Node]) -> HealthReport {
    let counts = HealthCounts::tally(nodes);
    let score = score_from_counts(&counts);
    HealthReport {
        score,
        suggested_status: cluster_status_for_score(score),
        counts,
        recommendations: health_recommendations(nodes),
    }
}
