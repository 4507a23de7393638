//! Error types for cluster coordination.
//!
//! Expected conditions (a malformed id, an invalid config, a cluster with
//! no primary) are plain return values elsewhere in the crate. This enum
//! only covers failures a caller cannot branch around: missing rows,
//! illegal lifecycle transitions, and lost compare-and-swap races.

use crate::{ClusterStatus, NodeStatus};

/// Errors that can occur during cluster coordination.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// No cluster with this id exists in the store.
    #[error("cluster {0} not found")]
    ClusterNotFound(String),

    /// No node with this id exists in the cluster.
    #[error("node {0} not found in cluster")]
    NodeNotFound(String),

    /// The cluster lifecycle does not allow this status change.
    #[error("cluster cannot transition from {from} to {to}")]
    InvalidClusterTransition {
        from: ClusterStatus,
        to: ClusterStatus,
    },

    /// The node lifecycle does not allow this status change.
    #[error("node cannot transition from {from} to {to}")]
    InvalidNodeTransition { from: NodeStatus, to: NodeStatus },

    /// Environment name outside development, staging, production.
    #[error("unknown environment '{0}'. valid options: development, staging, production")]
    UnknownEnvironment(String),

    /// A role assignment was computed against a stale snapshot.
    #[error("role assignment for cluster {cluster} is stale: expected {expected}, found {actual}")]
    RoleConflict {
        cluster: String,
        expected: String,
        actual: String,
    },

    /// Configuration could not be read or written.
    #[error("invalid cluster configuration: {0}")]
    Configuration(String),

    /// A cluster/node snapshot could not be decoded.
    #[error("invalid snapshot: {0}")]
    Snapshot(String),
}

impl ClusterError {
    /// Returns true if retrying against a fresh snapshot may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClusterError::RoleConflict { .. })
    }

    /// Creates a role conflict error, rendering absent nodes as `-`.
    pub fn role_conflict(cluster: &str, expected: Option<&str>, actual: Option<&str>) -> Self {
        ClusterError::RoleConflict {
            cluster: cluster.to_string(),
            expected: expected.unwrap_or("-").to_string(),
            actual: actual.unwrap_or("-").to_string(),
        }
    }
}
