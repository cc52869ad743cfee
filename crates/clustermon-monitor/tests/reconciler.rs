mod common;

use clustermon_core::*;
use clustermon_monitor::*;
use common::{not_found, transport, FakeCluster};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn reconciler(cluster: &Arc<FakeCluster>) -> Arc<Reconciler<Arc<FakeCluster>>> {
    Arc::new(Reconciler::new(Arc::clone(cluster)))
}

#[tokio::test]
async fn leader_links_exclude_unconnected_peers() {
    let cluster = FakeCluster::three_nodes();
    cluster.set_status(Ok(vec![
        Node::new("n1", NodeState::Leader)
            .with_peer("n2", LinkState::from("ACTIVE".to_string()))
            .with_peer("n3", LinkState::NoConnection),
        Node::new("n2", NodeState::Follower),
        Node::new("n3", NodeState::Follower),
    ]));
    let reconciler = reconciler(&cluster);

    reconciler.refresh(false).await;

    let snapshot = reconciler.snapshot();
    assert!(snapshot.model.has_cluster);
    assert_eq!(snapshot.model.nodes.len(), 3);
    assert_eq!(
        snapshot.model.links,
        vec![Link {
            id: "n1-n2".into(),
            source: "n1".into(),
            target: "n2".into(),
            status: LinkState::Other("ACTIVE".into()),
        }]
    );
}

#[tokio::test]
async fn missing_cluster_clears_model_and_configuration() {
    let cluster = FakeCluster::three_nodes();
    let reconciler = reconciler(&cluster);
    reconciler.refresh(true).await;
    assert!(reconciler.snapshot().configuration.is_some());

    cluster.set_status(Err(not_found()));
    cluster.set_config(Err(not_found()));
    let outcome = reconciler.refresh(false).await;

    let snapshot = reconciler.snapshot();
    assert!(!snapshot.model.has_cluster);
    assert!(snapshot.model.nodes.is_empty());
    assert!(snapshot.model.links.is_empty());
    assert!(snapshot.configuration.is_none());
    assert!(outcome.report().unwrap().errors.is_empty());
}

#[tokio::test]
async fn configuration_not_found_drops_cached_configuration() {
    let cluster = FakeCluster::three_nodes();
    let reconciler = reconciler(&cluster);
    reconciler.refresh(true).await;
    assert_eq!(reconciler.snapshot().configuration.unwrap().nodes.len(), 3);

    cluster.set_config(Err(not_found()));
    reconciler.refresh(true).await;
    assert!(reconciler.snapshot().configuration.is_none());
}

#[tokio::test]
async fn configuration_fetched_only_when_forced_or_missing() {
    let cluster = FakeCluster::three_nodes();
    let reconciler = reconciler(&cluster);

    reconciler.refresh(false).await;
    assert_eq!(cluster.calls.config(), 1);

    reconciler.refresh(false).await;
    assert_eq!(cluster.calls.config(), 1);

    reconciler.refresh(true).await;
    assert_eq!(cluster.calls.config(), 2);
}

#[tokio::test]
async fn own_status_refetched_only_on_leader_change() {
    let cluster = FakeCluster::three_nodes();
    let reconciler = reconciler(&cluster);

    let first = reconciler.refresh(false).await;
    assert!(first.report().unwrap().leader_changed);
    let after_first = cluster.calls.node();
    assert!(after_first >= 1);

    let second = reconciler.refresh(false).await;
    assert!(!second.report().unwrap().leader_changed);
    assert_eq!(cluster.calls.node(), after_first);

    cluster.set_status(Ok(vec![
        Node::new("n1", NodeState::Follower),
        Node::new("n2", NodeState::Leader).with_peer("n1", LinkState::Syncing),
        Node::new("n3", NodeState::Follower),
    ]));
    let third = reconciler.refresh(false).await;
    assert!(third.report().unwrap().leader_changed);
    assert_eq!(cluster.calls.node(), after_first + 1);
    assert_eq!(reconciler.snapshot().current_leader.unwrap().address, "n2");
}

#[tokio::test]
async fn election_refetches_own_status_every_pass() {
    let cluster = FakeCluster::three_nodes();
    let reconciler = reconciler(&cluster);
    reconciler.refresh(false).await;

    cluster.set_status(Ok(vec![
        Node::new("n1", NodeState::Candidate),
        Node::new("n2", NodeState::Candidate),
        Node::new("n3", NodeState::Follower),
    ]));
    let before = cluster.calls.node();
    for pass in 1..=3 {
        let outcome = reconciler.refresh(false).await;
        assert!(outcome.report().unwrap().leader_changed);
        assert_eq!(cluster.calls.node(), before + pass);
    }
    let snapshot = reconciler.snapshot();
    assert!(snapshot.current_leader.is_none());
    assert!(snapshot.model.links.is_empty());
}

#[tokio::test]
async fn links_never_outlive_previous_leader() {
    let cluster = FakeCluster::three_nodes();
    let reconciler = reconciler(&cluster);
    reconciler.refresh(false).await;
    assert_eq!(reconciler.snapshot().model.links.len(), 1);

    cluster.set_status(Ok(vec![
        Node::new("n1", NodeState::Follower).with_peer("n2", LinkState::InSync),
        Node::new("n2", NodeState::Follower),
        Node::new("n3", NodeState::Leader)
            .with_peer("n1", LinkState::OutOfSync)
            .with_peer("n2", LinkState::InSync),
    ]));
    reconciler.refresh(false).await;

    let links = reconciler.snapshot().model.links;
    let ids: Vec<_> = links.iter().map(|link| link.id.as_str()).collect();
    assert_eq!(ids, vec!["n3-n1", "n3-n2"]);
    assert!(links.iter().all(|link| link.source == "n3"));
}

#[tokio::test]
async fn transport_failure_keeps_model_and_is_reported() {
    let cluster = FakeCluster::three_nodes();
    let reconciler = reconciler(&cluster);
    reconciler.refresh(false).await;
    let before = reconciler.snapshot();

    cluster.set_status(Err(transport("connection reset")));
    let outcome = reconciler.refresh(false).await;

    let report = outcome.report().unwrap();
    assert_eq!(report.errors.len(), 1);
    assert!(matches!(report.errors[0], ClusterError::Transport(_)));
    let after = reconciler.snapshot();
    assert!(after.model.has_cluster);
    assert_eq!(after.model.nodes, before.model.nodes);
    assert_eq!(after.model.links, before.model.links);
}

#[tokio::test]
async fn current_node_follows_fresh_status_by_address() {
    let cluster = FakeCluster::three_nodes();
    let reconciler = reconciler(&cluster);
    reconciler.refresh(false).await;
    assert_eq!(reconciler.snapshot().current_node.unwrap().term, 0);

    let mut n2 = Node::new("n2", NodeState::Follower);
    n2.term = 4;
    cluster.set_status(Ok(vec![
        Node::new("n1", NodeState::Leader).with_peer("n2", LinkState::InSync),
        n2,
    ]));
    reconciler.refresh(false).await;

    let current = reconciler.snapshot().current_node.unwrap();
    assert_eq!(current.address, "n2");
    assert_eq!(current.term, 4);
}

#[tokio::test]
async fn own_status_failure_degrades_to_payload() {
    let cluster = FakeCluster::three_nodes();
    cluster.set_node(Err(ClusterError::NotFound {
        payload: Some(serde_json::json!({
            "address": "n2",
            "nodeState": "NO_CLUSTER",
            "endpoint": "http://n2:7200"
        })),
    }));
    let reconciler = reconciler(&cluster);

    let outcome = reconciler.refresh(false).await;

    let snapshot = reconciler.snapshot();
    assert!(!snapshot.model.has_cluster);
    let current = snapshot.current_node.unwrap();
    assert_eq!(current.node_state, NodeState::NoCluster);
    assert_eq!(current.endpoint, "http://n2:7200");
    assert!(outcome.report().unwrap().errors.is_empty());
}

#[tokio::test]
async fn local_location_mirrors_current_node() {
    let cluster = FakeCluster::three_nodes();
    cluster.set_locations(Ok(vec![
        Location {
            endpoint: "http://remote:7200".into(),
            ..Default::default()
        },
        Location {
            endpoint: "http://localhost:7200".into(),
            is_local: true,
            rpc_address: None,
        },
    ]));
    let reconciler = reconciler(&cluster);

    reconciler.load_initial().await;

    let locations = reconciler.snapshot().model.locations;
    assert_eq!(locations.len(), 2);
    assert_eq!(locations[1].endpoint, "http://n2:7200");
    assert_eq!(locations[1].rpc_address.as_deref(), Some("n2"));
}

#[tokio::test]
async fn initial_load_fetches_everything() {
    let cluster = FakeCluster::three_nodes();
    let reconciler = reconciler(&cluster);

    let outcome = reconciler.load_initial().await;

    assert!(!outcome.is_skipped());
    assert_eq!(cluster.calls.node(), 1);
    assert_eq!(cluster.calls.config(), 1);
    assert_eq!(cluster.calls.status(), 1);
    let snapshot = reconciler.snapshot();
    assert!(snapshot.model.has_cluster);
    assert_eq!(snapshot.current_node.unwrap().address, "n2");
    assert!(snapshot.refreshed_at.is_some());
}

#[tokio::test]
async fn refresh_while_in_flight_is_dropped() {
    let cluster = FakeCluster::three_nodes();
    let redraws = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&redraws);
    let reconciler = Arc::new(Reconciler::with_redraw(
        Arc::clone(&cluster),
        move |_: &ClusterSnapshot| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
    ));

    cluster.hold_status();
    let background = {
        let reconciler = Arc::clone(&reconciler);
        tokio::spawn(async move { reconciler.refresh(false).await })
    };
    while cluster.calls.status() == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(reconciler.phase(), Phase::Polling);

    let overlapping = reconciler.refresh(true).await;
    assert!(overlapping.is_skipped());
    assert_eq!(cluster.calls.status(), 1);
    assert_eq!(redraws.load(Ordering::SeqCst), 0);

    cluster.release_status();
    let first = background.await.unwrap();
    assert!(!first.is_skipped());
    assert_eq!(reconciler.phase(), Phase::Idle);
    assert_eq!(redraws.load(Ordering::SeqCst), 1);
    assert_eq!(cluster.calls.status(), 1);
}

#[tokio::test]
async fn dropped_forced_refresh_refetches_configuration_next_pass() {
    let cluster = FakeCluster::three_nodes();
    let reconciler = reconciler(&cluster);
    reconciler.refresh(false).await;
    assert_eq!(cluster.calls.config(), 1);

    cluster.hold_status();
    let background = {
        let reconciler = Arc::clone(&reconciler);
        tokio::spawn(async move { reconciler.refresh(false).await })
    };
    while cluster.calls.status() < 2 {
        tokio::task::yield_now().await;
    }
    assert!(reconciler.refresh(true).await.is_skipped());
    cluster.release_status();
    background.await.unwrap();
    assert_eq!(cluster.calls.config(), 1);

    cluster.set_config(Ok(ClusterConfig::with_nodes(vec![
        "n1".into(),
        "n2".into(),
        "n3".into(),
        "n4".into(),
    ])));
    reconciler.refresh(false).await;
    assert_eq!(cluster.calls.config(), 2);
    assert_eq!(reconciler.snapshot().configuration.unwrap().nodes.len(), 4);

    reconciler.refresh(false).await;
    assert_eq!(cluster.calls.config(), 2);
}

#[tokio::test]
async fn redraw_runs_after_failed_pass() {
    let cluster = FakeCluster::new();
    cluster.set_status(Err(transport("timeout")));
    cluster.set_node(Err(transport("timeout")));
    cluster.set_config(Err(transport("timeout")));
    let redraws = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&redraws);
    let reconciler = Reconciler::with_redraw(Arc::clone(&cluster), move |_: &ClusterSnapshot| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let outcome = reconciler.refresh(false).await;

    assert!(!outcome.report().unwrap().errors.is_empty());
    assert_eq!(redraws.load(Ordering::SeqCst), 1);
    assert_eq!(reconciler.phase(), Phase::Idle);
}

#[tokio::test]
async fn cancelled_pass_still_finishes() {
    let cluster = FakeCluster::three_nodes();
    let redraws = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&redraws);
    let reconciler = Arc::new(Reconciler::with_redraw(
        Arc::clone(&cluster),
        move |_: &ClusterSnapshot| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
    ));

    cluster.hold_status();
    let background = {
        let reconciler = Arc::clone(&reconciler);
        tokio::spawn(async move { reconciler.refresh(false).await })
    };
    while cluster.calls.status() == 0 {
        tokio::task::yield_now().await;
    }
    background.abort();
    assert!(background.await.unwrap_err().is_cancelled());

    assert_eq!(reconciler.phase(), Phase::Idle);
    assert_eq!(redraws.load(Ordering::SeqCst), 1);
    cluster.release_status();
    assert!(!reconciler.refresh(false).await.is_skipped());
}

#[tokio::test]
async fn subscribers_receive_each_snapshot() {
    let cluster = FakeCluster::three_nodes();
    let reconciler = reconciler(&cluster);
    let mut updates = reconciler.subscribe();

    reconciler.refresh(false).await;

    updates.changed().await.unwrap();
    let snapshot = updates.borrow_and_update().clone();
    assert!(snapshot.model.has_cluster);
    assert_eq!(snapshot.leader().unwrap().address, "n1");
    assert!(!snapshot.is_current_node_leader());
}
