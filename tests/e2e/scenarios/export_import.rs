//! NDJSON export/import round-trips, including legacy-format auto-detection.

use codeeagle_graph::{CancellationToken, EdgeType, NodeType};

use crate::harness::{edge, node, TestWorkspace};

#[test]
fn export_then_import_round_trips_across_stores() -> anyhow::Result<()> {
    let cancel = CancellationToken::none();

    let src_ws = TestWorkspace::empty()?;
    let src = src_ws.open_store("src.redb", "main", &["main"])?;
    src.add_node(&node("n1", NodeType::Class, "Widget", "src/widget.rs"), &cancel)?;
    src.add_node(&node("n2", NodeType::Method, "render", "src/widget.rs"), &cancel)?;
    src.add_edge(&edge("n1", EdgeType::Contains, "n2"), &cancel)?;

    let ndjson = src.export(&cancel)?;
    assert_eq!(ndjson.lines().count(), 3);
    assert_eq!(src.read_export_branch(&ndjson)?.as_deref(), Some("main"));

    let dst_ws = TestWorkspace::empty()?;
    let dst = dst_ws.open_store("dst.redb", "main", &["main"])?;
    let outcome = dst.import(&ndjson, &cancel)?;
    assert_eq!(outcome.nodes_imported, 2);
    assert_eq!(outcome.edges_imported, 1);

    let widget = dst.get_node("n1", &cancel)?.expect("imported");
    assert_eq!(widget.name, "Widget");

    Ok(())
}

#[test]
fn legacy_ndjson_without_a_branch_field_loads_into_write_branch() -> anyhow::Result<()> {
    let cancel = CancellationToken::none();
    let legacy = r#"{"kind":"node","data":{"id":"n1","type":"File","name":"a.rs","file_path":"a.rs"}}"#;

    let ws = TestWorkspace::empty()?;
    let store = ws.open_store("graph.redb", "imported", &["imported"])?;
    let outcome = store.import(legacy, &cancel)?;
    assert_eq!(outcome.nodes_imported, 1);

    let node = store.get_node("n1", &cancel)?.expect("loaded into write_branch");
    assert_eq!(node.graph_source(), Some("imported"));

    Ok(())
}

#[test]
fn import_into_branch_ignores_embedded_branch_field() -> anyhow::Result<()> {
    let cancel = CancellationToken::none();
    let ndjson = r#"{"kind":"node","branch":"other","data":{"id":"n1","type":"File","name":"a.rs","file_path":"a.rs"}}"#;

    let ws = TestWorkspace::empty()?;
    let store = ws.open_store("graph.redb", "main", &["main", "target"])?;
    store.import_into_branch("target", ndjson, &cancel)?;

    let node = store.get_node("n1", &cancel)?.expect("loaded despite mismatched branch field");
    assert_eq!(node.graph_source(), Some("target"));

    Ok(())
}
