//! Refresh cycles over a fleet as nodes fail and recover.

use armada_cluster::{
    ClusterStatus, ClusterStore, CoordinationStatus, EventSeverity, EventType, NodeStatus,
    RefreshCycle, COORDINATOR_ROLE,
};

use crate::helpers::{approx, role_holders, Fleet, HEALTHY_CPU};

#[test]
fn first_refresh_elects_top_priority_node() {
    let fleet = Fleet::five_nodes();
    let cluster_id = fleet.id().to_string();
    let top = fleet.node_id(0);
    let store = fleet.into_store();

    let outcome = RefreshCycle::new().run(&store, &cluster_id).unwrap();
    let report = &outcome.report;

    assert!(approx(report.health.score, 0.62));
    assert_eq!(report.health.suggested_status, ClusterStatus::Maintenance);
    assert_eq!(report.coordination.status, CoordinationStatus::Critical);
    assert!(outcome.roles_applied);

    let (primaries, coordinators) = role_holders(&store, &cluster_id);
    assert_eq!(primaries, vec![top.clone()]);
    assert_eq!(coordinators, vec![top]);

    // advisory only
    assert_eq!(store.cluster(&cluster_id).unwrap().status, ClusterStatus::Active);

    let types: Vec<EventType> = store.events().iter().map(|e| e.event_type).collect();
    assert!(types.contains(&EventType::HealthDegraded));
    assert!(types.contains(&EventType::PrimaryElected));
    assert!(types.contains(&EventType::CoordinatorElected));
}

#[test]
fn losing_the_primary_promotes_the_next_node() {
    let fleet = Fleet::five_nodes();
    let cluster_id = fleet.id().to_string();
    let (first, second) = (fleet.node_id(0), fleet.node_id(1));
    let store = fleet.into_store();
    let cycle = RefreshCycle::new();

    cycle.run(&store, &cluster_id).unwrap();
    store
        .set_node_status(&cluster_id, &first, NodeStatus::Offline)
        .unwrap();

    let outcome = cycle.run(&store, &cluster_id).unwrap();
    let report = &outcome.report;

    // the stored flags still pointed at the offline node when evaluated
    assert_eq!(report.coordination.issues.len(), 2);
    assert!(approx(report.health.score, 3.0 / 5.0 - 0.02 - 0.06 - 0.2));
    assert_eq!(report.failover.primary_candidate.as_deref(), Some(second.as_str()));

    let (primaries, coordinators) = role_holders(&store, &cluster_id);
    assert_eq!(primaries, vec![second.clone()]);
    assert_eq!(coordinators, vec![second.clone()]);

    let events = store.events();
    let status_change = events
        .iter()
        .find(|e| e.event_type == EventType::NodeStatusChanged)
        .unwrap();
    assert_eq!(status_change.node_id.as_deref(), Some(first.as_str()));

    let elected: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == EventType::PrimaryElected)
        .filter_map(|e| e.node_id.clone())
        .collect();
    assert_eq!(elected, vec![first, second]);
}

#[test]
fn tagged_node_takes_coordinator() {
    let mut fleet = Fleet::five_nodes();
    fleet.nodes[2].roles.push(COORDINATOR_ROLE.to_string());
    let cluster_id = fleet.id().to_string();
    let (top, tagged) = (fleet.node_id(0), fleet.node_id(2));
    let store = fleet.into_store();

    RefreshCycle::new().run(&store, &cluster_id).unwrap();
    let (primaries, coordinators) = role_holders(&store, &cluster_id);
    assert_eq!(primaries, vec![top]);
    assert_eq!(coordinators, vec![tagged]);

    let again = RefreshCycle::new().run(&store, &cluster_id).unwrap();
    assert!(again.report.role_assignment.is_none());
    assert_eq!(again.report.coordination.issues.len(), 0);
}

#[test]
fn total_outage_clears_roles() {
    let fleet = Fleet::five_nodes();
    let cluster_id = fleet.id().to_string();
    let online: Vec<String> = (0..4).map(|i| fleet.node_id(i)).collect();
    let store = fleet.into_store();
    let cycle = RefreshCycle::new();

    cycle.run(&store, &cluster_id).unwrap();
    for id in &online {
        store
            .set_node_status(&cluster_id, id, NodeStatus::Offline)
            .unwrap();
    }

    let outcome = cycle.run(&store, &cluster_id).unwrap();
    assert_eq!(outcome.report.health.score, 0.0);
    assert_eq!(outcome.report.health.suggested_status, ClusterStatus::Offline);
    assert!(outcome.report.failover.is_empty());

    let (primaries, coordinators) = role_holders(&store, &cluster_id);
    assert!(primaries.is_empty());
    assert!(coordinators.is_empty());

    let degraded = outcome
        .report
        .events
        .iter()
        .find(|e| e.event_type == EventType::HealthDegraded)
        .unwrap();
    assert_eq!(degraded.severity, EventSeverity::Critical);
}

#[test]
fn healthy_fleet_reports_recovery() {
    let mut fleet = Fleet::new(
        9,
        &[
            (10, HEALTHY_CPU, NodeStatus::Online),
            (20, HEALTHY_CPU, NodeStatus::Online),
        ],
    );
    fleet.cluster.status = ClusterStatus::Degraded;
    let cluster_id = fleet.id().to_string();
    let store = fleet.into_store();

    let outcome = RefreshCycle::new().run(&store, &cluster_id).unwrap();
    assert_eq!(outcome.report.health.score, 1.0);
    assert!(outcome
        .report
        .events
        .iter()
        .any(|e| e.event_type == EventType::HealthRecovered));
    assert!(approx(store.cluster(&cluster_id).unwrap().health_score, 1.0));
}
