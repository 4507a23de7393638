//! Fleet builders shared by the scenario tests.

use armada_cluster::{
    Cluster, ClusterConfig, ClusterStatus, IdentityManager, MemoryStore, Node, NodeStatus,
    Resources,
};
use chrono::{TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Cpu usage (out of 10) that lands a node in each health band.
pub const HEALTHY_CPU: f64 = 5.0;
pub const WARNING_CPU: f64 = 7.5;
pub const CRITICAL_CPU: f64 = 9.5;

/// A cluster plus its nodes, with generated ids.
pub struct Fleet {
    pub cluster: Cluster,
    pub nodes: Vec<Node>,
}

impl Fleet {
    /// Builds an active cluster whose nodes are `(priority, cpu_used, status)`.
    pub fn new(seed: u64, specs: &[(i64, f64, NodeStatus)]) -> Self {
        let mut ids = IdentityManager::with_rng(StdRng::seed_from_u64(seed));
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let cluster_id = ids.generate_cluster_id_at(created);

        let cluster = Cluster::new(cluster_id.clone(), "orders")
            .with_status(ClusterStatus::Active)
            .with_config(ClusterConfig {
                max_nodes: specs.len() as u32,
                ..ClusterConfig::default()
            });

        let nodes = specs
            .iter()
            .enumerate()
            .map(|(i, &(priority, cpu, status))| {
                let id = ids.generate_node_id(&cluster_id, i as u64 + 1);
                Node::new(id.clone(), cluster_id.clone(), format!("node {}", i + 1))
                    .with_status(status)
                    .with_priority(priority)
                    .with_capacity(Resources::new(10.0, 10.0, 10.0, 10.0))
                    .with_usage(Resources::new(cpu, 1.0, 1.0, 1.0))
            })
            .collect();

        Self { cluster, nodes }
    }

    /// Four online nodes (healthy, healthy, warning, critical) and one offline.
    pub fn five_nodes() -> Self {
        Self::new(
            1,
            &[
                (100, HEALTHY_CPU, NodeStatus::Online),
                (80, HEALTHY_CPU, NodeStatus::Online),
                (60, WARNING_CPU, NodeStatus::Online),
                (40, CRITICAL_CPU, NodeStatus::Online),
                (20, HEALTHY_CPU, NodeStatus::Offline),
            ],
        )
    }

    pub fn id(&self) -> &str {
        &self.cluster.id
    }

    /// Id of the node at `index` in build order.
    pub fn node_id(&self, index: usize) -> String {
        self.nodes[index].id.clone()
    }

    pub fn into_store(self) -> MemoryStore {
        let store = MemoryStore::new();
        let cluster_id = self.cluster.id.clone();
        store.insert_cluster(self.cluster);
        for node in self.nodes {
            store.insert_node(&cluster_id, node).unwrap();
        }
        store
    }
}

/// Ids of nodes currently flagged primary and coordinator.
pub fn role_holders(store: &MemoryStore, cluster_id: &str) -> (Vec<String>, Vec<String>) {
    use armada_cluster::ClusterStore;

    let nodes = store.nodes(cluster_id).unwrap();
    (
        armada_cluster::role_holders(&nodes, armada_cluster::Role::Primary),
        armada_cluster::role_holders(&nodes, armada_cluster::Role::Coordinator),
    )
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
