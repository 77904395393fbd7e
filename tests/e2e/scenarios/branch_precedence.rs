//! Multi-branch reads merge with first-branch-wins precedence, deduplicated.

use codeeagle_graph::{CancellationToken, NodeFilter, NodeType};

use crate::harness::{node, TestWorkspace};

#[test]
fn feature_branch_shadows_main_for_shared_ids() -> anyhow::Result<()> {
    let ws = TestWorkspace::empty()?;
    let cancel = CancellationToken::none();

    let main_writer = ws.open_store("graph.redb", "main", &["main"])?;
    main_writer.add_node(&node("shared", NodeType::Function, "old", "src/a.rs"), &cancel)?;
    main_writer.add_node(&node("only-main", NodeType::Function, "m", "src/m.rs"), &cancel)?;

    let feature_writer = ws.open_store("graph.redb", "feature", &["feature"])?;
    feature_writer.add_node(&node("shared", NodeType::Function, "new", "src/a.rs"), &cancel)?;
    feature_writer.add_node(&node("only-feature", NodeType::Function, "f", "src/f.rs"), &cancel)?;

    let reader = ws.open_store("graph.redb", "feature", &["feature", "main"])?;

    let shared = reader.get_node("shared", &cancel)?.expect("present in both branches");
    assert_eq!(shared.name, "new");
    assert_eq!(shared.graph_source(), Some("feature"));

    let all = reader.query_nodes(&NodeFilter::all(), &cancel)?;
    assert_eq!(all.len(), 3, "shared id counted once despite existing in both branches");

    let stats = reader.stats(&cancel)?;
    assert_eq!(stats.total_nodes, 3);

    Ok(())
}

#[test]
fn dropping_a_branch_only_removes_its_own_keys() -> anyhow::Result<()> {
    let ws = TestWorkspace::empty()?;
    let cancel = CancellationToken::none();

    let main_writer = ws.open_store("graph.redb", "main", &["main"])?;
    main_writer.add_node(&node("n1", NodeType::Module, "a", "src/a.rs"), &cancel)?;

    let feature_writer = ws.open_store("graph.redb", "feature", &["feature"])?;
    feature_writer.add_node(&node("n2", NodeType::Module, "b", "src/b.rs"), &cancel)?;

    feature_writer.delete_by_branch("feature", &cancel)?;

    let reader = ws.open_store("graph.redb", "main", &["main", "feature"])?;
    assert!(reader.get_node("n1", &cancel)?.is_some());
    assert!(reader.get_node("n2", &cancel)?.is_none());

    let mut branches = reader.list_branches(&cancel)?;
    branches.sort();
    assert_eq!(branches, vec!["main".to_string()]);

    Ok(())
}
