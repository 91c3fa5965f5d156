//! End-to-end tests for the graph engine.
//!
//! These tests drive the public API against the in-memory substrate and
//! check the mirror invariant, failure reporting and traversal bounds.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use graphkv::keys;
use graphkv::{
    properties, Direction, GraphConfig, GraphEngine, GraphError, IndexState, KvSubstrate,
    MemorySubstrate, Properties, Value,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn new_engine() -> (Arc<MemorySubstrate>, GraphEngine<MemorySubstrate>) {
    let substrate = Arc::new(MemorySubstrate::new());
    let engine = GraphEngine::new(substrate.clone(), GraphConfig::default()).unwrap();
    (substrate, engine)
}

/// People p1..p3, companies c1..c2, employment and friendship edges.
async fn build_company_graph(engine: &GraphEngine<MemorySubstrate>) {
    for (id, name, age) in [("p1", "Alice", 30), ("p2", "Bob", 25), ("p3", "Charlie", 35)] {
        engine
            .add_vertex(id, "person", properties([("name", name.into()), ("age", age.into())]))
            .await
            .unwrap();
    }
    for (id, name) in [("c1", "Tech Corp"), ("c2", "Data Inc")] {
        engine
            .add_vertex(id, "company", properties([("name", name.into())]))
            .await
            .unwrap();
    }
    for (person, company, role) in [("p1", "c1", "Engineer"), ("p2", "c1", "Designer"), ("p3", "c2", "Analyst")] {
        engine
            .add_edge(person, "WORKS_AT", company, properties([("role", role.into())]))
            .await
            .unwrap();
    }
    engine.add_edge("p1", "KNOWS", "p2", Properties::new()).await.unwrap();
    engine.add_edge("p2", "KNOWS", "p3", Properties::new()).await.unwrap();
}

/// Chain v0 → v1 → ... → v{n-1} along `NEXT`.
async fn build_chain(engine: &GraphEngine<MemorySubstrate>, n: usize) {
    for i in 0..n {
        engine
            .add_vertex(&format!("v{}", i), "node", Properties::new())
            .await
            .unwrap();
    }
    for i in 1..n {
        engine
            .add_edge(&format!("v{}", i - 1), "NEXT", &format!("v{}", i), Properties::new())
            .await
            .unwrap();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Core operations
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_end_to_end_company_graph() {
    let (_, engine) = new_engine();
    build_company_graph(&engine).await;

    let alice = engine.get_vertex("p1").await.unwrap();
    assert_eq!(alice.property("name"), Some(&Value::from("Alice")));
    assert_eq!(alice.property("age"), Some(&Value::from(30)));

    let employers = engine.get_neighbors("p1", "WORKS_AT", Direction::Out).await.unwrap();
    assert_eq!(employers.ids(), vec!["c1"]);
    assert_eq!(employers.vertices[0].property("name"), Some(&Value::from("Tech Corp")));

    let employees = engine.get_neighbors("c1", "WORKS_AT", Direction::In).await.unwrap();
    assert_eq!(employees.ids(), vec!["p1", "p2"]);
    assert!(!employees.is_degraded());

    let edge = engine.get_edge("p1", "WORKS_AT", "c1").await.unwrap();
    assert_eq!(edge.properties.get("role"), Some(&Value::from("Engineer")));

    assert!(engine.check_integrity().await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_every_edge_is_mirrored() {
    let (_, engine) = new_engine();
    build_company_graph(&engine).await;

    for edge in engine.edges().scan_edges().await.unwrap() {
        let k = &edge.key;
        assert!(engine
            .adjacency()
            .contains(&k.from, &k.edge_type, Direction::Out, &k.to)
            .await
            .unwrap());
        assert!(engine
            .adjacency()
            .contains(&k.to, &k.edge_type, Direction::In, &k.from)
            .await
            .unwrap());
        assert_eq!(
            engine.edge_index_state(&k.from, &k.edge_type, &k.to).await.unwrap(),
            IndexState::FullyIndexed
        );
    }
}

#[tokio::test]
async fn test_dangling_reference_leaves_no_trace() {
    let (substrate, engine) = new_engine();
    build_company_graph(&engine).await;
    let before = substrate.len();

    let err = engine
        .add_edge("ghost", "KNOWS", "p1", Properties::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::DanglingReference { .. }));
    assert!(!err.is_retryable());

    assert_eq!(substrate.len(), before);
    assert!(engine.get_edge("ghost", "KNOWS", "p1").await.unwrap_err().is_not_found());
    assert!(engine
        .get_neighbors("p1", "KNOWS", Direction::In)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_vertex_upsert_keeps_adjacency() {
    let (_, engine) = new_engine();
    build_company_graph(&engine).await;

    let updated = properties([("name", "Alice Smith".into()), ("age", 31.into())]);
    engine.add_vertex("p1", "person", updated.clone()).await.unwrap();

    assert_eq!(
        engine.get_neighbors("p1", "WORKS_AT", Direction::Out).await.unwrap().ids(),
        vec!["c1"]
    );
    assert_eq!(
        engine.get_neighbors("c1", "WORKS_AT", Direction::In).await.unwrap().ids(),
        vec!["p1", "p2"]
    );
    assert_eq!(
        engine.get_neighbors("p1", "KNOWS", Direction::Out).await.unwrap().ids(),
        vec!["p2"]
    );

    let alice = engine.get_vertex("p1").await.unwrap();
    assert_eq!(alice.properties, updated);
    assert!(engine.check_integrity().await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_repeated_add_edge_keeps_one_entry() {
    let (_, engine) = new_engine();
    build_company_graph(&engine).await;

    for _ in 0..3 {
        engine
            .add_edge("p1", "WORKS_AT", "c1", properties([("role", "Lead".into())]))
            .await
            .unwrap();
    }

    let employees = engine.get_neighbors("c1", "WORKS_AT", Direction::In).await.unwrap();
    assert_eq!(employees.ids(), vec!["p1", "p2"]);
    let lists = engine.adjacency().lists_for_vertex("c1").await.unwrap();
    assert!(lists.iter().all(|l| !l.has_duplicates()));

    let edge = engine.get_edge("p1", "WORKS_AT", "c1").await.unwrap();
    assert_eq!(edge.properties.get("role"), Some(&Value::from("Lead")));
}

// ─────────────────────────────────────────────────────────────────────────────
// Concurrency
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_add_edge_into_one_list() {
    let (_, engine) = new_engine();
    let engine = Arc::new(engine);
    engine.add_vertex("hub", "company", Properties::new()).await.unwrap();

    let n = 50;
    for i in 0..n {
        engine
            .add_vertex(&format!("p{}", i), "person", Properties::new())
            .await
            .unwrap();
    }

    let mut handles = Vec::with_capacity(n);
    for i in 0..n {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .add_edge(&format!("p{}", i), "WORKS_AT", "hub", Properties::new())
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let ids: HashSet<String> = engine
        .adjacency()
        .list_neighbors("hub", "WORKS_AT", Direction::In)
        .await
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(ids.len(), n);
    for i in 0..n {
        assert!(ids.contains(&format!("p{}", i)));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Partial failure and repair
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_partial_index_then_reconcile() {
    let (substrate, engine) = new_engine();
    build_company_graph(&engine).await;

    let in_list = engine
        .adjacency()
        .collection()
        .record_key(keys::adjacency_key("c2", "WORKS_AT", Direction::In));
    substrate.fail_next_append(in_list);

    let err = engine
        .add_edge("p1", "WORKS_AT", "c2", Properties::new())
        .await
        .unwrap_err();
    match &err {
        GraphError::PartialIndex { edge, state, .. } => {
            assert_eq!(edge.to, "c2");
            assert_eq!(*state, IndexState::OutIndexed);
        }
        other => panic!("expected PartialIndex, got {:?}", other),
    }

    // Forward direction already sees the edge, backward does not
    let employers = engine.get_neighbors("p1", "WORKS_AT", Direction::Out).await.unwrap();
    assert_eq!(employers.ids(), vec!["c1", "c2"]);
    let employees = engine.get_neighbors("c2", "WORKS_AT", Direction::In).await.unwrap();
    assert_eq!(employees.ids(), vec!["p3"]);

    let report = engine.reconcile().await.unwrap();
    assert_eq!(report.appended, 1);
    assert_eq!(
        engine.edge_index_state("p1", "WORKS_AT", "c2").await.unwrap(),
        IndexState::FullyIndexed
    );
    let employees = engine.get_neighbors("c2", "WORKS_AT", Direction::In).await.unwrap();
    assert_eq!(employees.ids(), vec!["p3", "p1"]);

    assert_eq!(engine.reconcile().await.unwrap().changes(), 0);
}

#[tokio::test]
async fn test_deleted_vertex_degrades_neighbor_reads() {
    let (substrate, engine) = new_engine();
    build_company_graph(&engine).await;

    // Bypass the cascade to simulate a crash between record and index cleanup
    let p2 = engine.vertices().collection().record_key("p2");
    assert!(substrate.delete(&p2).await.unwrap());

    let employees = engine.get_neighbors("c1", "WORKS_AT", Direction::In).await.unwrap();
    assert!(employees.is_degraded());
    assert_eq!(employees.ids(), vec!["p1"]);
    assert_eq!(employees.missing, vec!["p2"]);

    let report = engine.check_integrity().await.unwrap();
    assert_eq!(report.orphaned.len(), 3);

    engine.reconcile().await.unwrap();
    let employees = engine.get_neighbors("c1", "WORKS_AT", Direction::In).await.unwrap();
    assert!(!employees.is_degraded());
    assert!(engine.check_integrity().await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_unavailable_store_is_retryable() {
    let (substrate, engine) = new_engine();
    build_company_graph(&engine).await;
    substrate.set_available(false);

    let err = engine.get_vertex("p1").await.unwrap_err();
    assert!(matches!(err, GraphError::StoreUnavailable(_)));
    assert!(err.is_retryable());

    substrate.set_available(true);
    assert!(engine.get_vertex("p1").await.is_ok());
}

// ─────────────────────────────────────────────────────────────────────────────
// Traversal
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_traverse_direct_employers() {
    let (_, engine) = new_engine();
    build_company_graph(&engine).await;

    let visits = engine
        .traverse("p1", "WORKS_AT", Direction::Out, 1)
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].vertex_id, "c1");
    assert_eq!(visits[0].depth, 1);
}

#[tokio::test]
async fn test_traverse_never_exceeds_max_depth() {
    let (_, engine) = new_engine();
    build_chain(&engine, 10).await;

    for max_depth in 0..12 {
        let visits = engine
            .traverse("v0", "NEXT", Direction::Out, max_depth)
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert_eq!(visits.len(), max_depth.min(9));
        assert!(visits.iter().all(|v| v.depth >= 1 && v.depth <= max_depth));
    }
}

#[tokio::test]
async fn test_traverse_cycle_terminates() {
    let (_, engine) = new_engine();
    build_chain(&engine, 5).await;
    engine.add_edge("v4", "NEXT", "v0", Properties::new()).await.unwrap();

    let visits = engine
        .traverse("v2", "NEXT", Direction::Out, 100)
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    let ids: Vec<&str> = visits.iter().map(|v| v.vertex_id.as_str()).collect();
    assert_eq!(ids, vec!["v3", "v4", "v0", "v1"]);

    let unique: HashSet<&str> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
}

#[tokio::test]
async fn test_traverse_backwards_along_chain() {
    let (_, engine) = new_engine();
    build_chain(&engine, 4).await;

    let visits = engine
        .traverse("v3", "NEXT", Direction::In, 5)
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    let got: Vec<(&str, usize)> = visits.iter().map(|v| (v.vertex_id.as_str(), v.depth)).collect();
    assert_eq!(got, vec![("v2", 1), ("v1", 2), ("v0", 3)]);
}

#[tokio::test]
async fn test_traverse_cancellation() {
    let (_, engine) = new_engine();
    build_chain(&engine, 6).await;

    let cancel = Arc::new(AtomicBool::new(false));
    let mut traversal = engine
        .traverse("v0", "NEXT", Direction::Out, 10)
        .await
        .unwrap()
        .with_cancel(cancel.clone());

    let mut seen = Vec::new();
    while let Some(layer) = traversal.next_layer().await.unwrap() {
        seen.extend(layer);
        if seen.len() == 2 {
            cancel.store(true, Ordering::Release);
            break;
        }
    }
    assert!(matches!(
        traversal.next_layer().await,
        Err(GraphError::Cancelled { depth: 3 })
    ));

    // A fresh traversal is unaffected
    let all = engine
        .traverse("v0", "NEXT", Direction::Out, 10)
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(all.len(), 5);
}

// ─────────────────────────────────────────────────────────────────────────────
// Removal
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_remove_vertex_cleans_both_sides() {
    let (_, engine) = new_engine();
    build_company_graph(&engine).await;

    let removed = engine.remove_vertex("p2").await.unwrap();
    // WORKS_AT c1, KNOWS from p1, KNOWS to p3
    assert_eq!(removed, 3);

    assert_eq!(
        engine.get_neighbors("c1", "WORKS_AT", Direction::In).await.unwrap().ids(),
        vec!["p1"]
    );
    assert!(engine
        .get_neighbors("p1", "KNOWS", Direction::Out)
        .await
        .unwrap()
        .is_empty());
    assert!(engine
        .get_neighbors("p3", "KNOWS", Direction::In)
        .await
        .unwrap()
        .is_empty());

    let report = engine.check_integrity().await.unwrap();
    assert!(report.is_consistent());
    assert_eq!(report.edges_checked, 2);
}
