//! Concurrent refresh cycles against one shared store.

use std::sync::Arc;
use std::thread;

use armada_cluster::{plan_role_assignment, ClusterError, ClusterStore, RefreshCycle};

use crate::helpers::{role_holders, Fleet};

#[test]
fn parallel_refreshes_keep_one_holder_per_role() {
    let fleet = Fleet::five_nodes();
    let cluster_id = fleet.id().to_string();
    let top = fleet.node_id(0);
    let store = Arc::new(fleet.into_store());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let cluster_id = cluster_id.clone();
            thread::spawn(move || {
                for _ in 0..5 {
                    RefreshCycle::new().run(store.as_ref(), &cluster_id).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let (primaries, coordinators) = role_holders(&store, &cluster_id);
    assert_eq!(primaries, vec![top.clone()]);
    assert_eq!(coordinators, vec![top]);

    let elections = store
        .events()
        .iter()
        .filter(|e| e.event_type == armada_cluster::EventType::PrimaryElected)
        .count();
    assert_eq!(elections, 1);
}

#[test]
fn only_one_stale_plan_wins() {
    let fleet = Fleet::five_nodes();
    let cluster_id = fleet.id().to_string();
    let store = Arc::new(fleet.into_store());

    let plan = plan_role_assignment(&store.nodes(&cluster_id).unwrap()).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let cluster_id = cluster_id.clone();
            let plan = plan.clone();
            thread::spawn(move || store.assign_roles(&cluster_id, &plan))
        })
        .collect();
    let results: Vec<Result<(), ClusterError>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(ClusterError::is_retryable));

    let (primaries, coordinators) = role_holders(&store, &cluster_id);
    assert_eq!(primaries.len(), 1);
    assert_eq!(coordinators.len(), 1);
}
