//! Capacity and usage aggregation across a node set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::{ClusterMetric, MetricCategory};
use crate::{Cluster, Node, Resources};

/// Floor applied to utilization before dividing by it in `efficiency`.
const MIN_UTILIZATION_FOR_EFFICIENCY: f64 = 0.1;

const UTILIZATION_WEIGHT: f64 = 0.4;
const HEALTH_WEIGHT: f64 = 0.6;

/// Totals and per-node averages over a node set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub node_count: usize,
    pub total_capacity: Resources,
    pub total_usage: Resources,
    pub avg_cpu_usage_percent: f64,
    pub avg_memory_usage_percent: f64,
    pub avg_disk_usage_percent: f64,
    pub avg_network_in_bytes: f64,
    pub avg_network_out_bytes: f64,
}

impl SystemMetrics {
    /// Flattens the aggregate into gauge samples for the metric sink.
    pub fn to_samples(&self, cluster_id: &str, at: DateTime<Utc>) -> Vec<ClusterMetric> {
        let gauge = |name: &str, value: f64, unit: &str| {
            ClusterMetric::gauge(cluster_id, name, value, unit, at)
                .with_category(MetricCategory::Resource)
        };
        vec![
            gauge("cluster.nodes", self.node_count as f64, "count"),
            gauge("cluster.capacity.cpu", self.total_capacity.cpu, "cores"),
            gauge("cluster.capacity.memory", self.total_capacity.memory, "gb"),
            gauge("cluster.capacity.storage", self.total_capacity.storage, "gb"),
            gauge("cluster.capacity.network", self.total_capacity.network, "mbps"),
            gauge("cluster.usage.cpu", self.total_usage.cpu, "cores"),
            gauge("cluster.usage.memory", self.total_usage.memory, "gb"),
            gauge("cluster.usage.storage", self.total_usage.storage, "gb"),
            gauge("cluster.usage.network", self.total_usage.network, "mbps"),
            gauge("cluster.avg.cpu_usage", self.avg_cpu_usage_percent, "percent"),
            gauge("cluster.avg.memory_usage", self.avg_memory_usage_percent, "percent"),
            gauge("cluster.avg.disk_usage", self.avg_disk_usage_percent, "percent"),
            gauge("cluster.avg.network_in", self.avg_network_in_bytes, "bytes"),
            gauge("cluster.avg.network_out", self.avg_network_out_bytes, "bytes"),
        ]
    }
}

/// Sums capacity and usage and averages the reported per-node metrics.
///
/// An empty node set yields all zeros.
pub fn collect_system_metrics(nodes: &[Node]) -> SystemMetrics {
    if nodes.is_empty() {
        return SystemMetrics::default();
    }
    let count = nodes.len() as f64;
    let mean = |f: fn(&Node) -> f64| nodes.iter().map(f).sum::<f64>() / count;

    SystemMetrics {
        node_count: nodes.len(),
        total_capacity: nodes.iter().map(|n| n.capacity).sum(),
        total_usage: nodes.iter().map(|n| n.usage).sum(),
        avg_cpu_usage_percent: mean(|n| n.metrics.cpu_usage_percent),
        avg_memory_usage_percent: mean(|n| n.metrics.memory_usage_percent),
        avg_disk_usage_percent: mean(|n| n.metrics.disk_usage_percent),
        avg_network_in_bytes: mean(|n| n.metrics.network_in_bytes),
        avg_network_out_bytes: mean(|n| n.metrics.network_out_bytes),
    }
}

/// Derived cluster-level performance figures.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Mean of the cpu, memory and storage usage/capacity ratios.
    pub cluster_utilization: f64,
    /// Online nodes over all nodes.
    pub node_utilization: f64,
    pub health_score: f64,
    pub performance_score: f64,
    pub efficiency: f64,
}

impl PerformanceMetrics {
    pub fn to_samples(&self, cluster_id: &str, at: DateTime<Utc>) -> Vec<ClusterMetric> {
        let gauge = |name: &str, value: f64| {
            ClusterMetric::gauge(cluster_id, name, value, "ratio", at)
                .with_category(MetricCategory::Performance)
        };
        vec![
            gauge("cluster.utilization", self.cluster_utilization),
            gauge("cluster.node_utilization", self.node_utilization),
            gauge("cluster.health_score", self.health_score),
            gauge("cluster.performance_score", self.performance_score),
            gauge("cluster.efficiency", self.efficiency),
        ]
    }
}

fn ratio(used: f64, capacity: f64) -> f64 {
    if capacity > 0.0 {
        used / capacity
    } else {
        0.0
    }
}

/// Derives performance figures using the cluster's cached health score.
pub fn generate_performance_metrics(cluster: &Cluster, nodes: &[Node]) -> PerformanceMetrics {
    performance_metrics_with_score(nodes, cluster.health_score)
}

/// Same as [`generate_performance_metrics`] with an explicit health score,
/// for callers holding a fresher score than the cluster row.
pub fn performance_metrics_with_score(nodes: &[Node], health_score: f64) -> PerformanceMetrics {
    let system = collect_system_metrics(nodes);
    let cap = system.total_capacity;
    let used = system.total_usage;

    let cluster_utilization = (ratio(used.cpu, cap.cpu)
        + ratio(used.memory, cap.memory)
        + ratio(used.storage, cap.storage))
        / 3.0;
    let node_utilization = if nodes.is_empty() {
        0.0
    } else {
        nodes.iter().filter(|n| n.is_online()).count() as f64 / nodes.len() as f64
    };
    let performance_score = UTILIZATION_WEIGHT * cluster_utilization + HEALTH_WEIGHT * health_score;
    let efficiency = performance_score / cluster_utilization.max(MIN_UTILIZATION_FOR_EFFICIENCY);

    PerformanceMetrics {
        cluster_utilization,
        node_utilization,
        health_score,
        performance_score,
        efficiency,
    }
}
