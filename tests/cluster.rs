mod common;

use std::collections::HashMap;

use paxos_log::message::{PrepareRequest, ProposalId};

#[tokio::test]
async fn single_proposer_commits_everywhere() {
    let _guard = common::init_tracing();
    let (nodes, _state) = common::cluster(3, 0.0, 0);

    let committed = nodes[0].propose("x".to_string()).await;
    assert_eq!(committed, "x");

    for node in &nodes {
        assert_eq!(node.committed().await, Some("x".to_string()));
    }

    // A later proposal for this instance returns the decided value.
    assert_eq!(nodes[1].propose("y".to_string()).await, "x");
}

#[tokio::test]
async fn racing_proposers_agree_on_one_value() {
    let _guard = common::init_tracing();
    let (nodes, _state) = common::cluster(3, 0.0, 0);

    let (a, b) = tokio::join!(
        nodes[0].propose("a".to_string()),
        nodes[1].propose("b".to_string()),
    );

    // Exactly one of the two values won, and both callers observe it.
    assert_eq!(a, b);
    assert!(a == "a" || a == "b", "unexpected winner {a:?}");
    for node in &nodes {
        assert_eq!(node.committed().await, Some(a.clone()));
    }
}

#[tokio::test(start_paused = true)]
async fn survives_strict_minority_down() {
    let _guard = common::init_tracing();
    let (nodes, state) = common::cluster(5, 0.0, 0);
    state.take_down(3);
    state.take_down(4);

    let committed = nodes[0].propose("x".to_string()).await;
    assert_eq!(committed, "x");

    for node in &nodes[..3] {
        assert_eq!(node.committed().await, Some("x".to_string()));
    }
}

#[tokio::test(start_paused = true)]
async fn lossy_delivery_preserves_agreement() {
    let _guard = common::init_tracing();

    for seed in 0..10 {
        let (nodes, _state) = common::cluster(3, 0.3, seed);

        let (a, b) = tokio::join!(
            nodes[0].propose(format!("a{seed}")),
            nodes[2].propose(format!("b{seed}")),
        );
        assert_eq!(a, b, "seed {seed}: proposers disagree");

        // Learners that missed announcements may be uncommitted; every one
        // that committed must agree with the winner.
        for node in &nodes {
            if let Some(committed) = node.committed().await {
                assert_eq!(committed, a, "seed {seed}: divergent commit");
            }
        }
    }
}

#[tokio::test]
async fn log_appends_stay_ordered() {
    let _guard = common::init_tracing();
    let logs = common::log_cluster(3);

    logs[0].propose("v1".to_string()).await.unwrap();
    logs[0].propose("v2".to_string()).await.unwrap();
    let prefix = logs[0].propose("v3".to_string()).await.unwrap();
    assert_eq!(prefix, vec!["v1", "v2", "v3"]);

    let expected = vec![
        Some("v1".to_string()),
        Some("v2".to_string()),
        Some("v3".to_string()),
    ];
    for log in &logs {
        assert_eq!(log.read().await.unwrap(), expected);
    }
}

#[tokio::test]
async fn internal_rpc_ahead_of_local_log_grows_it() {
    let _guard = common::init_tracing();
    let logs = common::log_cluster(3);

    logs[0].propose("v1".to_string()).await.unwrap();

    // A peer driving slot 4 reaches this node before any local append
    // touched that slot; the log grows up to it and the prepare is served.
    let response = logs[1]
        .handle_prepare(
            4,
            PrepareRequest {
                proposal_id: ProposalId { round: 1, node_id: 0 },
            },
        )
        .await;
    assert!(response.is_some());

    let snapshot = logs[1].read().await.unwrap();
    assert_eq!(snapshot.len(), 5);
    assert_eq!(snapshot[0], Some("v1".to_string()));
    assert_eq!(&snapshot[1..], &[None, None, None, None]);
}

#[tokio::test(start_paused = true)]
async fn concurrent_appends_each_land_exactly_once() {
    let _guard = common::init_tracing();
    let logs = common::log_cluster(3);

    let (a, b) = tokio::join!(
        logs[0].propose("from-0".to_string()),
        logs[1].propose("from-1".to_string()),
    );
    a.unwrap();
    b.unwrap();

    // Both entries placed, each in exactly one slot.
    let committed: Vec<String> = logs[0]
        .read()
        .await
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in &committed {
        *counts.entry(value.clone()).or_default() += 1;
    }
    assert_eq!(counts.get("from-0"), Some(&1));
    assert_eq!(counts.get("from-1"), Some(&1));

    // Committed slots agree across nodes.
    let snapshots = [
        logs[0].read().await.unwrap(),
        logs[1].read().await.unwrap(),
        logs[2].read().await.unwrap(),
    ];
    let longest = snapshots.iter().map(Vec::len).max().unwrap_or(0);
    for slot in 0..longest {
        let decided: Vec<&String> = snapshots
            .iter()
            .filter_map(|snapshot| snapshot.get(slot).and_then(Option::as_ref))
            .collect();
        for value in &decided {
            assert_eq!(*value, decided[0], "slot {slot} diverged");
        }
    }
}
