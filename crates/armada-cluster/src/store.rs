//! Persistence collaborator.
//!
//! The coordination core never owns storage. It reads snapshots through
//! [`ClusterStore`] and hands decisions back through it. Role changes go
//! through [`ClusterStore::assign_roles`], which implementations must apply
//! as one atomic compare-and-swap so that concurrent refresh cycles can
//! never leave two primaries or two coordinators behind.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::coordination::{role_holders, Role, RoleAssignment};
use crate::events::{ClusterEvent, ClusterMetric, EventSeverity, EventType};
use crate::{Cluster, ClusterError, Node, NodeStatus};

/// A cluster row together with its node rows, as read at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cluster: Cluster,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Snapshot {
    pub fn from_json(input: &str) -> Result<Self, ClusterError> {
        serde_json::from_str(input).map_err(|e| ClusterError::Snapshot(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClusterError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ClusterError::Snapshot(format!("failed to read {}: {e}", path.display())))?;
        Self::from_json(&contents)
    }
}

/// Storage operations the coordination core depends on.
pub trait ClusterStore: Send + Sync {
    /// Reads one cluster row.
    fn cluster(&self, cluster_id: &str) -> Result<Cluster, ClusterError>;

    /// Reads every node row owned by the cluster.
    fn nodes(&self, cluster_id: &str) -> Result<Vec<Node>, ClusterError>;

    /// Atomically applies a role assignment.
    ///
    /// Must fail with [`ClusterError::RoleConflict`] without changing
    /// anything if the stored flags differ from the assignment's
    /// `expected_*` lists, or if a node the assignment promotes is no
    /// longer online.
    fn assign_roles(&self, cluster_id: &str, assignment: &RoleAssignment) -> Result<(), ClusterError>;

    /// Caches a freshly computed health score on the cluster row.
    fn update_cluster_health(
        &self,
        cluster_id: &str,
        score: f64,
        checked_at: DateTime<Utc>,
    ) -> Result<(), ClusterError>;

    fn append_event(&self, event: ClusterEvent) -> Result<(), ClusterError>;

    fn append_metric(&self, metric: ClusterMetric) -> Result<(), ClusterError>;

    /// Reads the cluster and its nodes together.
    fn snapshot(&self, cluster_id: &str) -> Result<Snapshot, ClusterError> {
        Ok(Snapshot {
            cluster: self.cluster(cluster_id)?,
            nodes: self.nodes(cluster_id)?,
        })
    }
}

#[derive(Debug, Default)]
struct StoreData {
    clusters: HashMap<String, Cluster>,
    nodes: HashMap<String, Vec<Node>>,
    events: Vec<ClusterEvent>,
    metrics: Vec<ClusterMetric>,
}

/// In-process store backed by a single lock.
///
/// Every mutation runs under the write lock, which makes
/// `assign_roles` serializable against concurrent callers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store holding one snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        let cluster_id = snapshot.cluster.id.clone();
        store.insert_cluster(snapshot.cluster);
        for node in snapshot.nodes {
            // the cluster was inserted just above
            let _ = store.insert_node(&cluster_id, node);
        }
        store
    }

    pub fn insert_cluster(&self, cluster: Cluster) {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.nodes.entry(cluster.id.clone()).or_default();
        data.clusters.insert(cluster.id.clone(), cluster);
    }

    /// Adds a node to an existing cluster, setting its ownership relation.
    pub fn insert_node(&self, cluster_id: &str, mut node: Node) -> Result<(), ClusterError> {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        if !data.clusters.contains_key(cluster_id) {
            return Err(ClusterError::ClusterNotFound(cluster_id.to_string()));
        }
        node.cluster_id = cluster_id.to_string();
        let nodes = data.nodes.entry(cluster_id.to_string()).or_default();
        nodes.retain(|n| n.id != node.id);
        nodes.push(node);
        Ok(())
    }

    /// Moves a node along its lifecycle, recording a lifecycle event when
    /// the status actually changes.
    pub fn set_node_status(
        &self,
        cluster_id: &str,
        node_id: &str,
        status: NodeStatus,
    ) -> Result<(), ClusterError> {
        let mut guard = self.data.write().unwrap_or_else(|e| e.into_inner());
        let data = &mut *guard;
        let node = data
            .nodes
            .get_mut(cluster_id)
            .ok_or_else(|| ClusterError::ClusterNotFound(cluster_id.to_string()))?
            .iter_mut()
            .find(|n| n.id == node_id)
            .ok_or_else(|| ClusterError::NodeNotFound(node_id.to_string()))?;
        let previous = node.status;
        node.transition_to(status)?;
        if previous == status {
            return Ok(());
        }

        let severity = match status {
            NodeStatus::Offline | NodeStatus::Error => EventSeverity::Warning,
            _ => EventSeverity::Info,
        };
        data.events.push(
            ClusterEvent::new(
                cluster_id,
                EventType::NodeStatusChanged,
                severity,
                format!("node {node_id} is now {status}"),
                Utc::now(),
            )
            .for_node(node_id)
            .with_detail("from", previous)
            .with_detail("to", status),
        );
        debug!(cluster = cluster_id, node = node_id, from = %previous, to = %status, "node status changed");
        Ok(())
    }

    /// Every event appended so far, oldest first.
    pub fn events(&self) -> Vec<ClusterEvent> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        data.events.clone()
    }

    /// Every metric sample appended so far, oldest first.
    pub fn metrics(&self) -> Vec<ClusterMetric> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        data.metrics.clone()
    }
}

impl ClusterStore for MemoryStore {
    fn cluster(&self, cluster_id: &str) -> Result<Cluster, ClusterError> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        data.clusters
            .get(cluster_id)
            .cloned()
            .ok_or_else(|| ClusterError::ClusterNotFound(cluster_id.to_string()))
    }

    fn nodes(&self, cluster_id: &str) -> Result<Vec<Node>, ClusterError> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        data.nodes
            .get(cluster_id)
            .cloned()
            .ok_or_else(|| ClusterError::ClusterNotFound(cluster_id.to_string()))
    }

    fn assign_roles(&self, cluster_id: &str, assignment: &RoleAssignment) -> Result<(), ClusterError> {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        let nodes = data
            .nodes
            .get_mut(cluster_id)
            .ok_or_else(|| ClusterError::ClusterNotFound(cluster_id.to_string()))?;

        for target in [&assignment.primary, &assignment.coordinator]
            .into_iter()
            .flatten()
        {
            if !nodes.iter().any(|n| &n.id == target) {
                return Err(ClusterError::NodeNotFound(target.clone()));
            }
        }

        if !assignment.matches(nodes) {
            let (expected, actual) = if role_holders(nodes, Role::Primary) != assignment.expected_primaries {
                (
                    assignment.expected_primaries.join(","),
                    role_holders(nodes, Role::Primary).join(","),
                )
            } else {
                (
                    assignment.expected_coordinators.join(","),
                    role_holders(nodes, Role::Coordinator).join(","),
                )
            };
            warn!(cluster = cluster_id, %expected, %actual, "rejected stale role assignment");
            return Err(ClusterError::role_conflict(
                cluster_id,
                Some(expected.as_str()).filter(|s| !s.is_empty()),
                Some(actual.as_str()).filter(|s| !s.is_empty()),
            ));
        }

        if let Some(node) = assignment.offline_target(nodes) {
            warn!(cluster = cluster_id, node = %node.id, status = %node.status, "rejected role for node that left service");
            return Err(ClusterError::role_conflict(
                cluster_id,
                Some(&format!("{} online", node.id)),
                Some(&format!("{} {}", node.id, node.status)),
            ));
        }

        assignment.apply(nodes);
        info!(
            cluster = cluster_id,
            primary = assignment.primary.as_deref().unwrap_or("-"),
            coordinator = assignment.coordinator.as_deref().unwrap_or("-"),
            "roles assigned"
        );
        Ok(())
    }

    fn update_cluster_health(
        &self,
        cluster_id: &str,
        score: f64,
        checked_at: DateTime<Utc>,
    ) -> Result<(), ClusterError> {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        let cluster = data
            .clusters
            .get_mut(cluster_id)
            .ok_or_else(|| ClusterError::ClusterNotFound(cluster_id.to_string()))?;
        cluster.health_score = score;
        cluster.last_health_check = Some(checked_at);
        Ok(())
    }

    fn append_event(&self, event: ClusterEvent) -> Result<(), ClusterError> {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.events.push(event);
        Ok(())
    }

    fn append_metric(&self, metric: ClusterMetric) -> Result<(), ClusterError> {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.metrics.push(metric);
        Ok(())
    }
}
