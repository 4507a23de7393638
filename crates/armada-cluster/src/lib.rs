//! armada-cluster: cluster coordination for armada.
//!
//! This crate holds the decision logic for a fleet of database clusters:
//! who is primary, who coordinates, how healthy the cluster is, and what
//! its resource picture looks like.
//!
//! # Architecture
//!
//! Everything is computed from an owned snapshot of one cluster and its
//! nodes. The pure layers are:
//!
//! - **Identity**: structured, human-readable cluster and node ids
//! - **Config**: defaults, environment templates, validation and merging
//! - **Health**: per-node classification, cluster score, advisory status
//! - **Coordination**: primary/coordinator election and failover planning
//! - **Metrics**: capacity/usage aggregation and performance figures
//!
//! Persistence stays behind [`ClusterStore`]. [`RefreshCycle`] ties the
//! layers together: read a snapshot, [`evaluate`] it, and hand the role
//! assignment, cached score, events and metric samples back to the store.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use armada_cluster::{evaluate, Cluster, Node, NodeStatus};
//!
//! let cluster = Cluster::new("cluster-a", "orders");
//! let nodes = vec![Node::new("n1", "cluster-a", "n1").with_status(NodeStatus::Online)];
//! let report = evaluate(&cluster, &nodes, chrono::Utc::now());
//! println!("{} -> {}", report.health.score, report.health.suggested_status);
//! ```

mod config;
mod coordination;
mod error;
mod events;
mod health;
mod identity;
mod metrics;
mod refresh;
mod store;
mod topology;

pub use config::{
    config_template, default_config, merge_with_defaults, validate_config, ClusterConfig,
    ConfigValidation, ConfigViolation, Environment, PartialClusterConfig,
    MIN_HEALTH_CHECK_INTERVAL_SECS,
};
pub use coordination::{
    check_coordination_status, detect_role_conflicts, generate_failover_plan,
    plan_role_assignment, rank_online_nodes, role_holders, select_coordinator_node,
    select_primary_node, CoordinationIssue, CoordinationReport, CoordinationStatus,
    FailoverCandidate, FailoverPlan, Role, RoleAssignment, RoleConflict, MIN_ONLINE_FRACTION,
};
pub use error::ClusterError;
pub use events::{
    ClusterEvent, ClusterMetric, EventCategory, EventSeverity, EventStatus, EventType,
    MetricCategory, MetricType,
};
pub use health::{
    assess, classify_resources, cluster_health_score, cluster_status_for_score,
    health_recommendations, node_health_status, refresh_node_health, HealthCounts, HealthReport,
    RatioThresholds, CPU_THRESHOLDS, MEMORY_THRESHOLDS, STORAGE_THRESHOLDS,
};
pub use identity::{
    cluster_suffix, parse_cluster_id, parse_node_id, validate_cluster_id, validate_node_id,
    IdentityManager, ParsedClusterId, ParsedNodeId,
};
pub use metrics::{
    collect_system_metrics, generate_performance_metrics, performance_metrics_with_score,
    PerformanceMetrics, SystemMetrics,
};
pub use refresh::{evaluate, ClusterReport, NodeHealth, RefreshCycle, RefreshOutcome};
pub use store::{ClusterStore, MemoryStore, Snapshot};
pub use topology::{
    Cluster, ClusterStatus, HealthStatus, Metadata, Node, NodeMetrics, NodeStatus, Placement,
    Resources, COORDINATOR_ROLE, WORKER_ROLE,
};
