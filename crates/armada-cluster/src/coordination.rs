//! Primary and coordinator election, coordination checks, failover planning.
//!
//! # Ranking
//!
//! Online nodes are ranked by priority (highest first), then by health
//! (healthy > warning > critical > unknown). The sort is stable, so when
//! both tie the node that appears first in the input wins. Identical
//! input always produces the identical ranking.
//!
//! # Role invariant
//!
//! At most one node per cluster may hold each of the primary and
//! coordinator flags. Election here only *plans*: a [`RoleAssignment`]
//! carries the flags it expects to find so the store can apply it as a
//! single compare-and-swap and refuse it if another refresh got there
//! first.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Cluster, HealthStatus, Node};

/// Share of `max_nodes` that must be online for a cluster to be healthy.
pub const MIN_ONLINE_FRACTION: f64 = 0.5;

/// Election order: higher priority first, then better health.
fn election_order(a: &Node, b: &Node) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| b.health.rank().cmp(&a.health.rank()))
}

/// Online nodes in election order.
pub fn rank_online_nodes(nodes: &[Node]) -> Vec<&Node> {
    let mut online: Vec<&Node> = nodes.iter().filter(|n| n.is_online()).collect();
    online.sort_by(|a, b| election_order(a, b));
    online
}

/// Picks the primary: the best-ranked online node.
pub fn select_primary_node(nodes: &[Node]) -> Option<&Node> {
    rank_online_nodes(nodes).into_iter().next()
}

/// Picks the coordinator.
///
/// Online nodes tagged `coordinator` (or already holding the flag) are
/// preferred; without any, the best-ranked online node is used.
pub fn select_coordinator_node(nodes: &[Node]) -> Option<&Node> {
    let ranked = rank_online_nodes(nodes);
    ranked
        .iter()
        .find(|n| n.is_coordinator_eligible())
        .or_else(|| ranked.first())
        .copied()
}

/// Coordination health on its own three-step scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinationStatus {
    Healthy,
    Degraded,
    Critical,
}

impl fmt::Display for CoordinationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinationStatus::Healthy => write!(f, "healthy"),
            CoordinationStatus::Degraded => write!(f, "degraded"),
            CoordinationStatus::Critical => write!(f, "critical"),
        }
    }
}

/// A problem found by [`check_coordination_status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoordinationIssue {
    NoPrimary,
    NoCoordinator,
    InsufficientOnline { online: usize, max_nodes: u32 },
}

impl fmt::Display for CoordinationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinationIssue::NoPrimary => write!(f, "no online primary node"),
            CoordinationIssue::NoCoordinator => write!(f, "no online coordinator node"),
            CoordinationIssue::InsufficientOnline { online, max_nodes } => write!(
                f,
                "only {online} of {max_nodes} configured nodes online (need at least 50%)"
            ),
        }
    }
}

/// Result of checking a cluster's current role assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinationReport {
    pub status: CoordinationStatus,
    /// Online node currently flagged primary.
    pub primary_node: Option<String>,
    /// Online node currently flagged coordinator.
    pub coordinator_node: Option<String>,
    pub online_nodes: usize,
    pub issues: Vec<CoordinationIssue>,
}

/// Checks whether the current flags give the cluster a working primary and
/// coordinator and enough online nodes. Issues accumulate independently.
pub fn check_coordination_status(cluster: &Cluster, nodes: &[Node]) -> CoordinationReport {
    let online: Vec<&Node> = nodes.iter().filter(|n| n.is_online()).collect();
    let primary = online.iter().find(|n| n.is_primary);
    let coordinator = online.iter().find(|n| n.is_coordinator);

    let mut issues = Vec::new();
    if primary.is_none() {
        issues.push(CoordinationIssue::NoPrimary);
    }
    if coordinator.is_none() {
        issues.push(CoordinationIssue::NoCoordinator);
    }
    let max_nodes = cluster.config.max_nodes;
    if (online.len() as f64) < f64::from(max_nodes) * MIN_ONLINE_FRACTION {
        issues.push(CoordinationIssue::InsufficientOnline {
            online: online.len(),
            max_nodes,
        });
    }

    let status = if issues.len() >= 2 || online.is_empty() {
        CoordinationStatus::Critical
    } else if issues.len() == 1 {
        CoordinationStatus::Degraded
    } else {
        CoordinationStatus::Healthy
    };

    debug!(cluster = %cluster.id, %status, issues = issues.len(), "checked coordination");

    CoordinationReport {
        status,
        primary_node: primary.map(|n| n.id.clone()),
        coordinator_node: coordinator.map(|n| n.id.clone()),
        online_nodes: online.len(),
        issues,
    }
}

/// One ranked entry of a failover plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailoverCandidate {
    pub node_id: String,
    pub priority: i64,
    pub health: HealthStatus,
}

impl From<&Node> for FailoverCandidate {
    fn from(node: &Node) -> Self {
        Self {
            node_id: node.id.clone(),
            priority: node.priority,
            health: node.health,
        }
    }
}

/// Ordered succession of online nodes for the primary and coordinator roles.
///
/// Advisory only: acting on it is the caller's job.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FailoverPlan {
    pub order: Vec<FailoverCandidate>,
    pub primary_candidate: Option<String>,
    /// Second in order, or the first when only one node is online.
    pub coordinator_candidate: Option<String>,
}

impl FailoverPlan {
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Ranks the online nodes into a failover plan.
pub fn generate_failover_plan(nodes: &[Node]) -> FailoverPlan {
    let order: Vec<FailoverCandidate> = rank_online_nodes(nodes)
        .into_iter()
        .map(FailoverCandidate::from)
        .collect();
    let primary_candidate = order.first().map(|c| c.node_id.clone());
    let coordinator_candidate = order
        .get(1)
        .or_else(|| order.first())
        .map(|c| c.node_id.clone());
    FailoverPlan {
        order,
        primary_candidate,
        coordinator_candidate,
    }
}

/// Which of the two exclusive roles a flag refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Primary,
    Coordinator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Primary => write!(f, "primary"),
            Role::Coordinator => write!(f, "coordinator"),
        }
    }
}

/// More than one node holds an exclusive role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConflict {
    pub role: Role,
    pub node_ids: Vec<String>,
}

/// Sorted ids of every node flagged with `role`.
pub fn role_holders(nodes: &[Node], role: Role) -> Vec<String> {
    let mut ids: Vec<String> = nodes
        .iter()
        .filter(|n| match role {
            Role::Primary => n.is_primary,
            Role::Coordinator => n.is_coordinator,
        })
        .map(|n| n.id.clone())
        .collect();
    ids.sort();
    ids
}

/// Reports every role held by more than one node.
pub fn detect_role_conflicts(nodes: &[Node]) -> Vec<RoleConflict> {
    [Role::Primary, Role::Coordinator]
        .into_iter()
        .filter_map(|role| {
            let node_ids = role_holders(nodes, role);
            (node_ids.len() > 1).then_some(RoleConflict { role, node_ids })
        })
        .collect()
}

/// A planned change to the primary/coordinator flags of one cluster.
///
/// `expected_*` hold the ids flagged when the plan was made (sorted).
/// The store must apply the whole assignment atomically, and only if the
/// stored flags still match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub primary: Option<String>,
    pub coordinator: Option<String>,
    pub expected_primaries: Vec<String>,
    pub expected_coordinators: Vec<String>,
}

impl RoleAssignment {
    /// True if the plan moves or clears the primary flag.
    pub fn changes_primary(&self) -> bool {
        self.expected_primaries.as_slice() != self.primary.as_slice()
    }

    /// True if the plan moves or clears the coordinator flag.
    pub fn changes_coordinator(&self) -> bool {
        self.expected_coordinators.as_slice() != self.coordinator.as_slice()
    }

    /// True if the flags currently on `nodes` are the ones this plan expects.
    pub fn matches(&self, nodes: &[Node]) -> bool {
        role_holders(nodes, Role::Primary) == self.expected_primaries
            && role_holders(nodes, Role::Coordinator) == self.expected_coordinators
    }

    /// The first planned role holder in `nodes` that is no longer online.
    pub fn offline_target<'a>(&self, nodes: &'a [Node]) -> Option<&'a Node> {
        [&self.primary, &self.coordinator]
            .into_iter()
            .flatten()
            .find_map(|target| nodes.iter().find(|n| &n.id == target && !n.is_online()))
    }

    /// Sets the planned flags and clears them everywhere else.
    pub fn apply(&self, nodes: &mut [Node]) {
        for node in nodes.iter_mut() {
            node.is_primary = self.primary.as_deref() == Some(node.id.as_str());
            node.is_coordinator = self.coordinator.as_deref() == Some(node.id.as_str());
        }
    }
}

/// Keeps a role holder if it is the only one flagged and is online.
fn sitting_holder(nodes: &[Node], holders: &[String]) -> Option<String> {
    match holders {
        [only] => nodes
            .iter()
            .find(|n| &n.id == only && n.is_online())
            .map(|n| n.id.clone()),
        _ => None,
    }
}

/// Plans a repair of the role flags, or `None` if they are already sound.
///
/// A sole, online holder keeps its role even if a better-ranked node
/// exists, so roles do not flap between refreshes. Otherwise the primary
/// goes to [`select_primary_node`] and the coordinator to
/// [`select_coordinator_node`]. With no online nodes, stale flags are
/// cleared.
pub fn plan_role_assignment(nodes: &[Node]) -> Option<RoleAssignment> {
    let expected_primaries = role_holders(nodes, Role::Primary);
    let expected_coordinators = role_holders(nodes, Role::Coordinator);

    let primary = sitting_holder(nodes, &expected_primaries)
        .or_else(|| select_primary_node(nodes).map(|n| n.id.clone()));
    let coordinator = sitting_holder(nodes, &expected_coordinators)
        .or_else(|| select_coordinator_node(nodes).map(|n| n.id.clone()));

    let assignment = RoleAssignment {
        primary,
        coordinator,
        expected_primaries,
        expected_coordinators,
    };

    if assignment.changes_primary() || assignment.changes_coordinator() {
        debug!(
            primary = ?assignment.primary,
            coordinator = ?assignment.coordinator,
            "planned role reassignment"
        );
        Some(assignment)
    } else {
        None
    }
}
