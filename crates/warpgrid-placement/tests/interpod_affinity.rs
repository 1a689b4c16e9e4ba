//! End-to-end scoring scenarios for the inter-pod affinity scorer.

use std::collections::HashMap;

use warpgrid_placement::{InterPodAffinityScorer, NodeScore, PlacementError, ScoringConfig};
use warpgrid_state::{
    Affinity, AffinityTerm, ClusterSnapshot, Node, Pod, PodAffinity, PodAntiAffinity,
    WeightedAffinityTerm,
};

const HOST: &str = "kubernetes.io/hostname";
const ZONE: &str = "topology.kubernetes.io/zone";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn node(name: &str, zone: &str) -> Node {
    Node::new(name).with_label(HOST, name).with_label(ZONE, zone)
}

fn scorer() -> InterPodAffinityScorer {
    InterPodAffinityScorer::new(ScoringConfig::default()).unwrap()
}

fn by_name(scores: &[NodeScore]) -> HashMap<&str, i64> {
    scores
        .iter()
        .map(|s| (s.node_name.as_str(), s.score))
        .collect()
}

fn required_affinity(selector: &str, topology_key: &str) -> Affinity {
    Affinity {
        pod_affinity: Some(PodAffinity {
            required: vec![AffinityTerm::new(selector, topology_key)],
            preferred: Vec::new(),
        }),
        pod_anti_affinity: None,
    }
}

fn preferred_affinity(terms: Vec<WeightedAffinityTerm>) -> Affinity {
    Affinity {
        pod_affinity: Some(PodAffinity {
            required: Vec::new(),
            preferred: terms,
        }),
        pod_anti_affinity: None,
    }
}

#[test]
fn placed_pod_required_affinity_pulls_incoming_pod() {
    init_tracing();
    let nodes = vec![node("n1", "z1"), node("n2", "z2")];
    let q = Pod::new("ns", "q")
        .on_node("n1")
        .with_affinity(required_affinity("app=P", HOST));
    let snapshot = ClusterSnapshot::new(nodes.clone(), vec![q]);
    let p = Pod::new("ns", "p").with_label("app", "P");

    let scores = scorer().score(&p, &nodes, &snapshot).unwrap();

    assert_eq!(
        scores,
        vec![
            NodeScore {
                node_name: "n1".to_string(),
                score: 10
            },
            NodeScore {
                node_name: "n2".to_string(),
                score: 0
            },
        ]
    );
}

#[test]
fn symmetry_spreads_over_shared_topology() {
    let nodes = vec![node("n1", "z1"), node("n2", "z1"), node("n3", "z2")];
    let a = Pod::new("ns", "a")
        .on_node("n1")
        .with_affinity(required_affinity("app=b", ZONE));
    let snapshot = ClusterSnapshot::new(nodes.clone(), vec![a]);
    let b = Pod::new("ns", "b").with_label("app", "b");

    let scores = scorer().score(&b, &nodes, &snapshot).unwrap();
    let scores = by_name(&scores);

    assert_eq!(scores["n1"], 10);
    assert_eq!(scores["n2"], 10);
    assert_eq!(scores["n3"], 0);
}

#[test]
fn unrelated_rules_give_zero_everywhere() {
    let nodes = vec![node("n1", "z1"), node("n2", "z2")];
    let placed = Pod::new("ns", "q")
        .on_node("n1")
        .with_affinity(required_affinity("app=other", HOST));
    let snapshot = ClusterSnapshot::new(nodes.clone(), vec![placed]);
    let incoming = Pod::new("ns", "p")
        .with_label("app", "p")
        .with_affinity(preferred_affinity(vec![WeightedAffinityTerm::new(
            10,
            AffinityTerm::new("app=nobody", HOST),
        )]));

    let scores = scorer().score(&incoming, &nodes, &snapshot).unwrap();

    assert!(scores.iter().all(|s| s.score == 0));
    assert_eq!(scores.len(), 2);
}

#[test]
fn equal_raw_scores_normalize_to_zero() {
    // Both nodes share the zone, so both receive the same increment.
    let nodes = vec![node("n1", "z1"), node("n2", "z1")];
    let placed = Pod::new("ns", "db").on_node("n1").with_label("app", "db");
    let snapshot = ClusterSnapshot::new(nodes.clone(), vec![placed]);
    let incoming = Pod::new("ns", "web").with_affinity(preferred_affinity(vec![
        WeightedAffinityTerm::new(7, AffinityTerm::new("app=db", ZONE)),
    ]));

    let scores = scorer().score(&incoming, &nodes, &snapshot).unwrap();

    assert!(scores.iter().all(|s| s.score == 0), "got {scores:?}");
}

#[test]
fn raw_scores_scale_between_min_and_max() {
    let nodes = vec![node("n1", "z1"), node("n2", "z2"), node("n3", "z3")];
    let placed = vec![
        Pod::new("ns", "a").on_node("n1").with_label("app", "a"),
        Pod::new("ns", "b").on_node("n2").with_label("app", "b"),
        Pod::new("ns", "c").on_node("n3").with_label("app", "c"),
    ];
    let snapshot = ClusterSnapshot::new(nodes.clone(), placed);
    let incoming = Pod::new("ns", "p").with_affinity(preferred_affinity(vec![
        WeightedAffinityTerm::new(2, AffinityTerm::new("app=a", HOST)),
        WeightedAffinityTerm::new(5, AffinityTerm::new("app=b", HOST)),
        WeightedAffinityTerm::new(9, AffinityTerm::new("app=c", HOST)),
    ]));

    let scores = scorer().score(&incoming, &nodes, &snapshot).unwrap();

    let values: Vec<i64> = scores.iter().map(|s| s.score).collect();
    assert_eq!(values, vec![0, 4, 10]);
}

#[test]
fn preferred_anti_affinity_pushes_away() {
    let nodes = vec![node("n1", "z1"), node("n2", "z2")];
    let placed = Pod::new("ns", "noisy").on_node("n1").with_label("app", "noisy");
    let snapshot = ClusterSnapshot::new(nodes.clone(), vec![placed]);
    let incoming = Pod::new("ns", "quiet").with_affinity(Affinity {
        pod_affinity: None,
        pod_anti_affinity: Some(PodAntiAffinity {
            required: Vec::new(),
            preferred: vec![WeightedAffinityTerm::new(5, AffinityTerm::new("app=noisy", HOST))],
        }),
    });

    let scores = scorer().score(&incoming, &nodes, &snapshot).unwrap();
    let scores = by_name(&scores);

    // Raw {n1: -5, n2: 0}.
    assert_eq!(scores["n1"], 0);
    assert_eq!(scores["n2"], 10);
}

#[test]
fn placed_pod_preferred_anti_affinity_repels_incoming_pod() {
    let nodes = vec![node("n1", "z1"), node("n2", "z2")];
    let placed = Pod::new("ns", "solo").on_node("n2").with_affinity(Affinity {
        pod_affinity: None,
        pod_anti_affinity: Some(PodAntiAffinity {
            required: vec![AffinityTerm::new("app=web", HOST)],
            preferred: vec![WeightedAffinityTerm::new(3, AffinityTerm::new("app=web", HOST))],
        }),
    });
    let snapshot = ClusterSnapshot::new(nodes.clone(), vec![placed]);
    let incoming = Pod::new("ns", "web").with_label("app", "web");

    let scores = scorer().score(&incoming, &nodes, &snapshot).unwrap();
    let scores = by_name(&scores);

    assert_eq!(scores["n1"], 10);
    assert_eq!(scores["n2"], 0);
}

#[test]
fn invalid_selector_aborts_scoring() {
    let nodes = vec![node("n1", "z1"), node("n2", "z2")];
    let placed = Pod::new("ns", "q")
        .on_node("n1")
        .with_affinity(required_affinity("==", HOST));
    let snapshot = ClusterSnapshot::new(nodes.clone(), vec![placed]);
    let incoming = Pod::new("ns", "p");

    let err = scorer().score(&incoming, &nodes, &snapshot).unwrap_err();

    assert!(matches!(err, PlacementError::InvalidSelector(_)), "got {err:?}");
}

#[test]
fn incoming_invalid_selector_aborts_scoring() {
    let nodes = vec![node("n1", "z1")];
    let placed = Pod::new("ns", "db").on_node("n1").with_label("app", "db");
    let snapshot = ClusterSnapshot::new(nodes.clone(), vec![placed]);
    let incoming = Pod::new("ns", "web").with_affinity(preferred_affinity(vec![
        WeightedAffinityTerm::new(1, AffinityTerm::new("app in (db", HOST)),
    ]));

    assert!(scorer().score(&incoming, &nodes, &snapshot).is_err());
}

#[test]
fn scoring_is_idempotent() {
    let nodes: Vec<Node> = (0..6).map(|i| node(&format!("n{i}"), &format!("z{}", i % 3))).collect();
    let placed: Vec<Pod> = (0..12)
        .map(|i| {
            let pod = Pod::new("ns", format!("p{i}"))
                .on_node(format!("n{}", i % 6))
                .with_label("app", format!("a{}", i % 4));
            if i % 3 == 0 {
                pod.with_affinity(required_affinity("role=new", ZONE))
            } else {
                pod
            }
        })
        .collect();
    let snapshot = ClusterSnapshot::new(nodes.clone(), placed);
    let incoming = Pod::new("ns", "new")
        .with_label("role", "new")
        .with_affinity(preferred_affinity(vec![WeightedAffinityTerm::new(
            4,
            AffinityTerm::new("app=a1", HOST),
        )]));

    let scorer = scorer();
    let first = scorer.score(&incoming, &nodes, &snapshot).unwrap();
    let second = scorer.score(&incoming, &nodes, &snapshot).unwrap();

    assert_eq!(first, second);
}

#[test]
fn parallel_and_serial_passes_agree() {
    let nodes: Vec<Node> = (0..200)
        .map(|i| node(&format!("n{i}"), &format!("z{}", i % 7)))
        .collect();
    let placed: Vec<Pod> = (0..1000)
        .map(|i| {
            let pod = Pod::new("ns", format!("p{i}"))
                .on_node(format!("n{}", i % 200))
                .with_label("app", format!("a{}", i % 5));
            match i % 4 {
                0 => pod.with_affinity(required_affinity("role=new", ZONE)),
                1 => pod.with_affinity(preferred_affinity(vec![WeightedAffinityTerm::new(
                    (i % 10) as i32 + 1,
                    AffinityTerm::new("role=new", HOST),
                )])),
                _ => pod,
            }
        })
        .collect();
    let snapshot = ClusterSnapshot::new(nodes.clone(), placed);
    let incoming = Pod::new("ns", "new")
        .with_label("role", "new")
        .with_affinity(Affinity {
            pod_affinity: Some(PodAffinity {
                required: Vec::new(),
                preferred: vec![WeightedAffinityTerm::new(3, AffinityTerm::new("app=a2", ZONE))],
            }),
            pod_anti_affinity: Some(PodAntiAffinity {
                required: Vec::new(),
                preferred: vec![WeightedAffinityTerm::new(6, AffinityTerm::new("app=a4", HOST))],
            }),
        });

    let serial = InterPodAffinityScorer::new(ScoringConfig {
        parallelism: 1,
        ..Default::default()
    })
    .unwrap();
    let parallel = InterPodAffinityScorer::new(ScoringConfig {
        parallelism: 8,
        ..Default::default()
    })
    .unwrap();

    let a = serial.score(&incoming, &nodes, &snapshot).unwrap();
    let b = parallel.score(&incoming, &nodes, &snapshot).unwrap();

    assert_eq!(a, b);
    assert!(a.iter().any(|s| s.score == 10));
    assert!(a.iter().any(|s| s.score == 0));
}

#[test]
fn zero_hard_weight_ignores_required_terms_of_placed_pods() {
    let nodes = vec![node("n1", "z1"), node("n2", "z2")];
    let q = Pod::new("ns", "q")
        .on_node("n1")
        .with_affinity(required_affinity("app=P", HOST));
    let snapshot = ClusterSnapshot::new(nodes.clone(), vec![q]);
    let p = Pod::new("ns", "p").with_label("app", "P");
    let scorer = InterPodAffinityScorer::new(ScoringConfig {
        hard_pod_affinity_weight: 0,
        ..Default::default()
    })
    .unwrap();

    let scores = scorer.score(&p, &nodes, &snapshot).unwrap();

    assert!(scores.iter().all(|s| s.score == 0));
}

#[test]
fn terms_resolve_namespaces_from_their_declaring_pod() {
    let nodes = vec![node("n1", "z1"), node("n2", "z2")];
    // q lives in "team-a"; its term has no namespaces, so it only selects
    // pods in "team-a".
    let q = Pod::new("team-a", "q")
        .on_node("n1")
        .with_affinity(required_affinity("app=P", HOST));
    let snapshot = ClusterSnapshot::new(nodes.clone(), vec![q]);

    let foreign = Pod::new("team-b", "p").with_label("app", "P");
    let local = Pod::new("team-a", "p").with_label("app", "P");

    let foreign_scores = scorer().score(&foreign, &nodes, &snapshot).unwrap();
    let local_scores = scorer().score(&local, &nodes, &snapshot).unwrap();

    assert!(foreign_scores.iter().all(|s| s.score == 0));
    assert_eq!(by_name(&local_scores)["n1"], 10);
}

#[test]
fn candidate_subset_only_scores_candidates() {
    let all = vec![node("n1", "z1"), node("n2", "z1"), node("n3", "z2")];
    let q = Pod::new("ns", "q")
        .on_node("n1")
        .with_affinity(required_affinity("app=P", ZONE));
    let snapshot = ClusterSnapshot::new(all.clone(), vec![q]);
    let p = Pod::new("ns", "p").with_label("app", "P");

    // n1 was filtered out upstream; its pods still count.
    let candidates = vec![all[1].clone(), all[2].clone()];
    let scores = scorer().score(&p, &candidates, &snapshot).unwrap();

    assert_eq!(scores.len(), 2);
    assert_eq!(by_name(&scores)["n2"], 10);
    assert_eq!(by_name(&scores)["n3"], 0);
}

#[test]
fn scores_fixture_cluster() {
    init_tracing();
    let json = include_str!("fixtures/zoned_cluster.json");
    let snapshot = ClusterSnapshot::from_json(json).unwrap();
    let nodes = snapshot.nodes();

    let frontend = Pod::new("shop", "frontend-0")
        .with_label("app", "frontend")
        .with_affinity(Affinity {
            pod_affinity: Some(PodAffinity {
                required: Vec::new(),
                preferred: vec![WeightedAffinityTerm::new(10, AffinityTerm::new("app=postgres", ZONE))],
            }),
            pod_anti_affinity: Some(PodAntiAffinity {
                required: Vec::new(),
                preferred: vec![WeightedAffinityTerm::new(
                    5,
                    AffinityTerm::new("app=batch", HOST).in_namespaces(["jobs"]),
                )],
            }),
        });

    let scores = scorer().score(&frontend, &nodes, &snapshot).unwrap();
    let scores = by_name(&scores);

    // Raw: a1 = 10, a2 = 10 - 5, b1 = 20 (checkout's soft term), c1 = 0.
    assert_eq!(scores["node-a1"], 5);
    assert_eq!(scores["node-a2"], 2);
    assert_eq!(scores["node-b1"], 10);
    assert_eq!(scores["node-c1"], 0);
}
