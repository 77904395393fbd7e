//! Absolute-to-relative path migration, dry-run vs. live, with edge remapping.

use codeeagle_graph::{compute_edge_id, compute_node_id, CancellationToken, EdgeType, NodeType};

use crate::harness::{edge, node, TestWorkspace};

#[test]
fn dry_run_reports_without_mutating_the_store() -> anyhow::Result<()> {
    let ws = TestWorkspace::empty()?;
    let cancel = CancellationToken::none();
    let store = ws.open_store("graph.redb", "main", &["main"])?;

    let old_id = compute_node_id(NodeType::File, "/repo/src/lib.rs", "lib.rs");
    store.add_node(
        &node(&old_id, NodeType::File, "lib.rs", "/repo/src/lib.rs"),
        &cancel,
    )?;

    let report = store.migrate_abs_to_rel_paths(&["/repo".to_string()], true, &cancel)?;
    assert!(report.dry_run);
    assert_eq!(report.nodes_migrated, 1);

    // Dry run must not have touched the store.
    assert!(store.get_node(&old_id, &cancel)?.is_some());

    Ok(())
}

#[test]
fn live_run_rewrites_node_ids_and_remaps_touching_edges() -> anyhow::Result<()> {
    let ws = TestWorkspace::empty()?;
    let cancel = CancellationToken::none();
    let store = ws.open_store("graph.redb", "main", &["main"])?;

    let old_file_id = compute_node_id(NodeType::File, "/repo/src/lib.rs", "lib.rs");
    let old_func_id = compute_node_id(NodeType::Function, "/repo/src/lib.rs", "parse");
    store.add_node(
        &node(&old_file_id, NodeType::File, "lib.rs", "/repo/src/lib.rs"),
        &cancel,
    )?;
    store.add_node(
        &node(&old_func_id, NodeType::Function, "parse", "/repo/src/lib.rs"),
        &cancel,
    )?;
    store.add_edge(&edge(&old_file_id, EdgeType::Contains, &old_func_id), &cancel)?;

    let report = store.migrate_abs_to_rel_paths(&["/repo".to_string()], false, &cancel)?;
    assert!(!report.dry_run);
    assert_eq!(report.nodes_migrated, 2);
    assert_eq!(report.edges_remapped, 1);
    assert!(report.branch_errors.is_empty());

    let new_file_id = compute_node_id(NodeType::File, "src/lib.rs", "lib.rs");
    let new_func_id = compute_node_id(NodeType::Function, "src/lib.rs", "parse");

    assert!(store.get_node(&old_file_id, &cancel)?.is_none());
    let migrated_file = store.get_node(&new_file_id, &cancel)?.expect("rewritten node");
    assert_eq!(migrated_file.file_path, "src/lib.rs");

    let new_edge_id = compute_edge_id(&new_file_id, EdgeType::Contains, &new_func_id);
    let migrated_edge = store.get_edge(&new_edge_id, &cancel)?.expect("remapped edge");
    assert_eq!(migrated_edge.source_id, new_file_id);
    assert_eq!(migrated_edge.target_id, new_func_id);

    Ok(())
}

#[test]
fn chunked_batch_size_still_migrates_every_node() -> anyhow::Result<()> {
    use codeeagle_graph::GraphConfig;

    let ws = TestWorkspace::empty()?;
    let cancel = CancellationToken::none();
    let config = GraphConfig {
        migration_batch_size: Some(2),
        ..GraphConfig::default()
    };
    let store = codeeagle_graph::GraphStore::open_with_config(
        ws.db_path("graph.redb"),
        "main",
        vec!["main".to_string()],
        config,
    )?;

    for i in 0..5 {
        let path = format!("/repo/src/m{i}.rs");
        let id = compute_node_id(NodeType::Module, &path, &format!("m{i}"));
        store.add_node(&node(&id, NodeType::Module, &format!("m{i}"), &path), &cancel)?;
    }

    let report = store.migrate_abs_to_rel_paths(&["/repo".to_string()], false, &cancel)?;
    assert_eq!(report.nodes_migrated, 5);

    for i in 0..5 {
        let rel = format!("src/m{i}.rs");
        let new_id = compute_node_id(NodeType::Module, &rel, &format!("m{i}"));
        assert!(store.get_node(&new_id, &cancel)?.is_some());
    }

    Ok(())
}
