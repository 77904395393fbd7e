//! Ingest a small file's worth of entities, then query and traverse them.

use codeeagle_graph::{CancellationToken, Direction, EdgeType, NodeFilter, NodeType};

use crate::harness::{edge, node, TestWorkspace};

#[test]
fn ingest_query_and_traverse_a_small_graph() -> anyhow::Result<()> {
    let ws = TestWorkspace::empty()?;
    let cancel = CancellationToken::none();
    let store = ws.open_store("graph.redb", "main", &["main"])?;

    let file = node("n-file", NodeType::File, "lib.rs", "src/lib.rs");
    let func_a = node("n-a", NodeType::Function, "parse", "src/lib.rs");
    let func_b = node("n-b", NodeType::Function, "parse_inner", "src/lib.rs");

    store.add_node(&file, &cancel)?;
    store.add_node(&func_a, &cancel)?;
    store.add_node(&func_b, &cancel)?;
    store.add_edge(&edge("n-file", EdgeType::Contains, "n-a"), &cancel)?;
    store.add_edge(&edge("n-file", EdgeType::Contains, "n-b"), &cancel)?;
    store.add_edge(&edge("n-a", EdgeType::Calls, "n-b"), &cancel)?;

    let fetched = store.get_node("n-a", &cancel)?.expect("node exists");
    assert_eq!(fetched.name, "parse");
    assert_eq!(fetched.graph_source(), Some("main"));

    let functions = store.query_nodes(
        &NodeFilter::all().with_type(NodeType::Function).with_file_path("src/lib.rs"),
        &cancel,
    )?;
    assert_eq!(functions.len(), 2);

    let callees = store.get_neighbors("n-a", Some(EdgeType::Calls), Direction::Outgoing, &cancel)?;
    assert_eq!(callees.len(), 1);
    assert_eq!(callees[0].id, "n-b");

    let containers = store.get_neighbors("n-a", Some(EdgeType::Contains), Direction::Incoming, &cancel)?;
    assert_eq!(containers.len(), 1);
    assert_eq!(containers[0].id, "n-file");

    let callers = store.get_neighbors("n-b", None, Direction::Incoming, &cancel)?;
    let caller_ids: Vec<&str> = callers.iter().map(|n| n.id.as_str()).collect();
    assert!(caller_ids.contains(&"n-file"));
    assert!(caller_ids.contains(&"n-a"));

    let stats = store.stats(&cancel)?;
    assert_eq!(stats.total_nodes, 3);
    assert_eq!(stats.total_edges, 3);
    assert_eq!(stats.nodes_by_type[&NodeType::Function], 2);

    Ok(())
}

#[test]
fn deleting_a_node_cascades_to_its_edges() -> anyhow::Result<()> {
    let ws = TestWorkspace::empty()?;
    let cancel = CancellationToken::none();
    let store = ws.open_store("graph.redb", "main", &["main"])?;

    store.add_node(&node("n-a", NodeType::Function, "a", "src/a.rs"), &cancel)?;
    store.add_node(&node("n-b", NodeType::Function, "b", "src/b.rs"), &cancel)?;
    store.add_edge(&edge("n-a", EdgeType::Calls, "n-b"), &cancel)?;

    store.delete_node("n-a", &cancel)?;

    assert!(store.get_node("n-a", &cancel)?.is_none());
    assert!(store.get_edges("n-b", None, Direction::Both, &cancel)?.is_empty());

    Ok(())
}
