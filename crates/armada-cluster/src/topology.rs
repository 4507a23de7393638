//! Cluster topology data model.
//!
//! Defines clusters, their nodes, the two lifecycle state machines and the
//! orthogonal node health axis. Everything here is a plain value type: the
//! coordination functions take snapshots of these records and never reach
//! back into the store.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ClusterConfig;
use crate::ClusterError;

/// Role tag that marks a node as eligible for coordinator election.
pub const COORDINATOR_ROLE: &str = "coordinator";

/// Role tag given to ordinary data-serving nodes.
pub const WORKER_ROLE: &str = "worker";

/// Lifecycle status of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterStatus {
    #[default]
    Initializing,
    Active,
    Degraded,
    Maintenance,
    Offline,
    Decommissioning,
}

impl ClusterStatus {
    /// Returns true if the lifecycle graph has an edge from `self` to `next`.
    ///
    /// Staying in the same status is always allowed.
    pub fn can_transition_to(self, next: ClusterStatus) -> bool {
        use ClusterStatus::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Initializing, Active)
                | (Active, Degraded)
                | (Active, Maintenance)
                | (Degraded, Active)
                | (Degraded, Maintenance)
                | (Degraded, Offline)
                | (Maintenance, Active)
                | (Maintenance, Degraded)
                | (Maintenance, Offline)
                | (Offline, Maintenance)
                | (Offline, Decommissioning)
        )
    }

    /// Validates a transition and returns the new status.
    pub fn transition(self, next: ClusterStatus) -> Result<ClusterStatus, ClusterError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ClusterError::InvalidClusterTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Returns true once decommissioning has started. Terminal.
    pub fn is_terminal(self) -> bool {
        self == ClusterStatus::Decommissioning
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterStatus::Initializing => write!(f, "initializing"),
            ClusterStatus::Active => write!(f, "active"),
            ClusterStatus::Degraded => write!(f, "degraded"),
            ClusterStatus::Maintenance => write!(f, "maintenance"),
            ClusterStatus::Offline => write!(f, "offline"),
            ClusterStatus::Decommissioning => write!(f, "decommissioning"),
        }
    }
}

/// Lifecycle status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Provisioning,
    Online,
    Offline,
    Maintenance,
    Error,
    Decommissioning,
}

impl NodeStatus {
    /// Returns true if the lifecycle graph has an edge from `self` to `next`.
    pub fn can_transition_to(self, next: NodeStatus) -> bool {
        use NodeStatus::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Provisioning, Online)
                | (Online, Offline)
                | (Online, Maintenance)
                | (Online, Error)
                | (Offline, Online)
                | (Offline, Maintenance)
                | (Offline, Error)
                | (Offline, Decommissioning)
                | (Maintenance, Online)
                | (Maintenance, Offline)
                | (Maintenance, Error)
                | (Maintenance, Decommissioning)
                | (Error, Offline)
                | (Error, Maintenance)
                | (Error, Decommissioning)
        )
    }

    /// Validates a transition and returns the new status.
    pub fn transition(self, next: NodeStatus) -> Result<NodeStatus, ClusterError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ClusterError::InvalidNodeTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Provisioning => write!(f, "provisioning"),
            NodeStatus::Online => write!(f, "online"),
            NodeStatus::Offline => write!(f, "offline"),
            NodeStatus::Maintenance => write!(f, "maintenance"),
            NodeStatus::Error => write!(f, "error"),
            NodeStatus::Decommissioning => write!(f, "decommissioning"),
        }
    }
}

/// Health of a node, independent of its lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
    #[default]
    Unknown,
}

impl HealthStatus {
    /// Election preference: healthy > warning > critical > unknown.
    pub fn rank(self) -> u8 {
        match self {
            HealthStatus::Healthy => 3,
            HealthStatus::Warning => 2,
            HealthStatus::Critical => 1,
            HealthStatus::Unknown => 0,
        }
    }

    /// Combines two classifications, keeping the more severe one.
    ///
    /// Only meaningful for computed classifications (healthy, warning,
    /// critical); `Unknown` never comes out of a ratio check.
    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        fn severity(h: HealthStatus) -> u8 {
            match h {
                HealthStatus::Healthy => 0,
                HealthStatus::Unknown => 1,
                HealthStatus::Warning => 2,
                HealthStatus::Critical => 3,
            }
        }
        if severity(other) > severity(self) {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Warning => write!(f, "warning"),
            HealthStatus::Critical => write!(f, "critical"),
            HealthStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Resource amounts along the four tracked dimensions.
///
/// Used both for declared capacity and observed usage. Units are
/// caller-defined (cores, GB, GB, Mbps) but must agree between the two.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    pub cpu: f64,
    pub memory: f64,
    pub storage: f64,
    pub network: f64,
}

impl Resources {
    pub fn new(cpu: f64, memory: f64, storage: f64, network: f64) -> Self {
        Self {
            cpu,
            memory,
            storage,
            network,
        }
    }
}

impl std::ops::Add for Resources {
    type Output = Resources;

    fn add(self, rhs: Resources) -> Resources {
        Resources {
            cpu: self.cpu + rhs.cpu,
            memory: self.memory + rhs.memory,
            storage: self.storage + rhs.storage,
            network: self.network + rhs.network,
        }
    }
}

impl std::iter::Sum for Resources {
    fn sum<I: Iterator<Item = Resources>>(iter: I) -> Resources {
        iter.fold(Resources::default(), |acc, r| acc + r)
    }
}

/// Metrics a node reports about itself, already expressed as percentages
/// or byte rates by the agent that collected them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeMetrics {
    pub cpu_usage_percent: f64,
    pub memory_usage_percent: f64,
    pub disk_usage_percent: f64,
    pub network_in_bytes: f64,
    pub network_out_bytes: f64,
}

/// Where a node runs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Placement {
    pub region: String,
    pub zone: String,
    pub hostname: String,
    pub internal_addr: Option<String>,
    pub external_addr: Option<String>,
}

/// String key-value map with a few well-known keys.
///
/// Free-form on the wire, but callers go through the typed accessors for
/// keys the coordination layer itself understands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(pub BTreeMap<String, String>);

impl Metadata {
    pub const OWNER: &'static str = "owner";
    pub const ENVIRONMENT: &'static str = "environment";
    pub const PROVIDER: &'static str = "provider";

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn owner(&self) -> Option<&str> {
        self.get(Self::OWNER)
    }

    pub fn environment(&self) -> Option<&str> {
        self.get(Self::ENVIRONMENT)
    }

    pub fn provider(&self) -> Option<&str> {
        self.get(Self::PROVIDER)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A logical fleet of nodes under one lifecycle.
///
/// `health_score` and `last_health_check` are a display cache. The score
/// is always recomputable from the node set and is never authoritative.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Cluster {
    /// Assigned once at creation. Never reused.
    pub id: String,
    pub name: String,
    pub description: String,
    pub region: String,
    pub version: String,
    pub status: ClusterStatus,
    pub config: ClusterConfig,
    pub metadata: Metadata,
    pub labels: Metadata,
    pub tags: Vec<String>,
    pub health_score: f64,
    pub last_health_check: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub decommissioned_at: Option<DateTime<Utc>>,
}

impl Cluster {
    /// Creates a cluster in `initializing` with the default configuration.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: Utc::now(),
            ..Default::default()
        }
    }

    pub fn with_config(mut self, config: ClusterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_status(mut self, status: ClusterStatus) -> Self {
        self.status = status;
        self
    }

    /// Moves the cluster along its lifecycle, stamping activation and
    /// decommission times.
    pub fn transition_to(&mut self, next: ClusterStatus, at: DateTime<Utc>) -> Result<(), ClusterError> {
        self.status = self.status.transition(next)?;
        match next {
            ClusterStatus::Active if self.activated_at.is_none() => self.activated_at = Some(at),
            ClusterStatus::Decommissioning => self.decommissioned_at = Some(at),
            _ => {}
        }
        Ok(())
    }

    /// Soft-deleted clusters keep their row with a decommission stamp.
    pub fn is_decommissioned(&self) -> bool {
        self.decommissioned_at.is_some()
    }
}

/// A single fleet member.
///
/// `cluster_id` is the stored ownership relation. The cluster fragment
/// embedded in the node id is for humans only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub id: String,
    pub cluster_id: String,
    pub name: String,
    pub status: NodeStatus,
    pub health: HealthStatus,
    pub placement: Placement,
    pub capacity: Resources,
    pub usage: Resources,
    pub metrics: NodeMetrics,
    pub roles: Vec<String>,
    pub is_primary: bool,
    pub is_coordinator: bool,
    pub priority: i64,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub uptime_secs: u64,
    pub configuration: Metadata,
    pub metadata: Metadata,
}

impl Node {
    /// Creates a provisioning node with unknown health and no roles.
    pub fn new(id: impl Into<String>, cluster_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cluster_id: cluster_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_health(mut self, health: HealthStatus) -> Self {
        self.health = health;
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_capacity(mut self, capacity: Resources) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_usage(mut self, usage: Resources) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_metrics(mut self, metrics: NodeMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn coordinator(mut self) -> Self {
        self.is_coordinator = true;
        self
    }

    pub fn is_online(&self) -> bool {
        self.status == NodeStatus::Online
    }

    pub fn is_offline(&self) -> bool {
        self.status == NodeStatus::Offline
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// True if the node carries the coordinator tag or already holds the role.
    pub fn is_coordinator_eligible(&self) -> bool {
        self.is_coordinator || self.has_role(COORDINATOR_ROLE)
    }

    /// Moves the node along its lifecycle.
    pub fn transition_to(&mut self, next: NodeStatus) -> Result<(), ClusterError> {
        self.status = self.status.transition(next)?;
        Ok(())
    }

    pub fn is_decommissioned(&self) -> bool {
        self.status == NodeStatus::Decommissioning
    }
}
