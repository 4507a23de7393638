//! Id generation and parsing over many seeded draws.

use armada_cluster::{
    cluster_suffix, parse_cluster_id, parse_node_id, validate_cluster_id, validate_node_id,
    IdentityManager,
};
use chrono::{Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn generated_ids_round_trip() {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut ids = IdentityManager::with_rng(StdRng::seed_from_u64(99));
    let epoch = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();

    for _ in 0..500 {
        let at = epoch + Duration::milliseconds(rng.random_range(0..1_000_000_000_000));
        let cluster_id = ids.generate_cluster_id_at(at);
        assert!(validate_cluster_id(&cluster_id), "{cluster_id}");

        let parsed = parse_cluster_id(&cluster_id).unwrap();
        assert_eq!(parsed.created_at.timestamp(), at.timestamp());
        assert_eq!(
            cluster_id,
            format!(
                "cluster-{}-{}-{}",
                parsed.random1,
                at.format("%Y-%m-%d-%H-%M-%S"),
                parsed.random2
            )
        );

        let number = rng.random::<u64>();
        let node_id = ids.generate_node_id(&cluster_id, number);
        assert!(validate_node_id(&node_id), "{node_id}");
        let node = parse_node_id(&node_id).unwrap();
        assert_eq!(node.node_number, number);
        assert_eq!(node.cluster_suffix, cluster_suffix(&cluster_id));
    }
}

#[test]
fn same_seed_same_ids() {
    let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let mut a = IdentityManager::with_rng(StdRng::seed_from_u64(5));
    let mut b = IdentityManager::with_rng(StdRng::seed_from_u64(5));
    for n in 0..20 {
        let (ca, cb) = (a.generate_cluster_id_at(at), b.generate_cluster_id_at(at));
        assert_eq!(ca, cb);
        assert_eq!(a.generate_node_id(&ca, n), b.generate_node_id(&cb, n));
    }
}

#[test]
fn malformed_ids_are_rejected() {
    let bad_clusters = [
        "",
        "cluster-",
        "cluster-AB-2024-01-01-00-00-00-cdefghij",
        "cluster-abcdefgh-2024-01-01-00-00-00",
        "cluster-abcdefgh-2024-01-01-00-00-00-cdefghij-extra",
        "cluster-abcdefgh-2024-13-01-00-00-00-cdefghij",
        "cluster-abcdefgh-2023-02-29-00-00-00-cdefghij",
        "cluster-abcdefgh-2024-1-01-00-00-00-cdefghij",
        "node-abcdefgh-2024-1-abcdefgh",
    ];
    for id in bad_clusters {
        assert!(!validate_cluster_id(id), "{id}");
        assert!(parse_cluster_id(id).is_none(), "{id}");
    }

    let bad_nodes = [
        "",
        "node-abcdefgh-2024-abcdefgh",
        "node-abcdefgh-24-1-abcdefgh",
        "node-abcdefgh-2024-x1-abcdefgh",
        "node-abcdefgh-2024-1-ABCDEFGH",
        "node-abcdefgh-2024-99999999999999999999999-abcdefgh",
        "cluster-abcdefgh-2024-01-01-00-00-00-cdefghij",
    ];
    for id in bad_nodes {
        assert!(!validate_node_id(id), "{id}");
        assert!(parse_node_id(id).is_none(), "{id}");
    }
}
