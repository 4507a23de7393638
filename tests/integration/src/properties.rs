//! Scoring, status and coordination properties over random node sets.

use armada_cluster::{
    check_coordination_status, cluster_health_score, cluster_status_for_score, config_template,
    default_config, select_coordinator_node, select_primary_node, Cluster, ClusterConfig,
    ClusterStatus, CoordinationStatus, Environment, HealthStatus, Node, NodeStatus,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const STATUSES: [NodeStatus; 4] = [
    NodeStatus::Online,
    NodeStatus::Offline,
    NodeStatus::Maintenance,
    NodeStatus::Provisioning,
];

const HEALTHS: [HealthStatus; 4] = [
    HealthStatus::Healthy,
    HealthStatus::Warning,
    HealthStatus::Critical,
    HealthStatus::Unknown,
];

fn random_nodes(rng: &mut StdRng) -> Vec<Node> {
    let count = rng.random_range(0..20);
    (0..count)
        .map(|i| {
            let id = format!("n{i}");
            Node::new(id.clone(), "c1", id)
                .with_status(STATUSES[rng.random_range(0..STATUSES.len())])
                .with_health(HEALTHS[rng.random_range(0..HEALTHS.len())])
                .with_priority(rng.random_range(0..5))
        })
        .collect()
}

fn healthy(id: &str, priority: i64) -> Node {
    Node::new(id, "c1", id)
        .with_status(NodeStatus::Online)
        .with_health(HealthStatus::Healthy)
        .with_priority(priority)
}

#[test]
fn score_always_in_unit_interval() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..1000 {
        let score = cluster_health_score(&random_nodes(&mut rng));
        assert!((0.0..=1.0).contains(&score), "{score}");
    }
    assert_eq!(cluster_health_score(&[]), 0.0);
}

#[test]
fn all_healthy_is_exactly_one() {
    for n in 1..30 {
        let nodes: Vec<Node> = (0..n).map(|i| healthy(&format!("n{i}"), 0)).collect();
        assert_eq!(cluster_health_score(&nodes), 1.0);
    }
}

#[test]
fn replacing_nodes_never_raises_the_score() {
    let mut rng = StdRng::seed_from_u64(12);
    for _ in 0..500 {
        let mut nodes = random_nodes(&mut rng);
        nodes.push(healthy("h", 0));
        let before = cluster_health_score(&nodes);

        let last = nodes.len() - 1;
        let mut critical = nodes.clone();
        critical[last].health = HealthStatus::Critical;
        let after = cluster_health_score(&critical);
        assert!(after < before || before == 0.0, "{before} -> {after}");

        let online: Vec<usize> = (0..nodes.len()).filter(|&i| nodes[i].is_online()).collect();
        let pick = online[rng.random_range(0..online.len())];
        let mut offline = nodes.clone();
        offline[pick].status = NodeStatus::Offline;
        assert!(cluster_health_score(&offline) <= before);
    }
}

#[test]
fn score_to_status_thresholds() {
    assert_eq!(cluster_status_for_score(0.95), ClusterStatus::Active);
    assert_eq!(cluster_status_for_score(0.8), ClusterStatus::Degraded);
    assert_eq!(cluster_status_for_score(0.5), ClusterStatus::Maintenance);
    assert_eq!(cluster_status_for_score(0.1), ClusterStatus::Offline);
}

#[test]
fn election_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(13);
    for _ in 0..200 {
        let nodes = random_nodes(&mut rng);
        let first = select_primary_node(&nodes).map(|n| n.id.clone());
        for _ in 0..3 {
            assert_eq!(select_primary_node(&nodes).map(|n| n.id.clone()), first);
        }
        assert_eq!(first.is_some(), nodes.iter().any(Node::is_online));
        assert_eq!(
            select_coordinator_node(&nodes).is_some(),
            nodes.iter().any(Node::is_online)
        );
    }

    let tie = vec![
        healthy("a", 7).with_health(HealthStatus::Critical),
        healthy("b", 7),
    ];
    assert_eq!(select_primary_node(&tie).unwrap().id, "b");
}

#[test]
fn coordination_issues_accumulate() {
    let cluster = Cluster::new("c1", "t").with_config(ClusterConfig {
        max_nodes: 10,
        ..ClusterConfig::default()
    });
    let nodes = vec![healthy("a", 1), healthy("b", 1)];
    let report = check_coordination_status(&cluster, &nodes);
    assert_eq!(report.issues.len(), 3);
    assert_eq!(report.status, CoordinationStatus::Critical);

    let cluster = cluster.with_config(ClusterConfig {
        max_nodes: 2,
        ..ClusterConfig::default()
    });
    let nodes = vec![healthy("a", 1), healthy("b", 1).coordinator()];
    let report = check_coordination_status(&cluster, &nodes);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.status, CoordinationStatus::Degraded);
}

#[test]
fn templates_are_independent_values() {
    assert_eq!(config_template(Environment::Production).max_nodes, 20);

    let mut a = default_config();
    let b = default_config();
    assert_eq!(a, b);
    a.max_nodes = 99;
    assert_ne!(a, b);
    assert_eq!(default_config(), b);

    // round trips through JSON as well as TOML
    let json = serde_json::to_string(&b).unwrap();
    let decoded: ClusterConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, b);
}
