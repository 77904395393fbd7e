use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use codeeagle_graph::{Edge, EdgeType, GraphStore, Node, NodeType};
use tempfile::TempDir;

/// Manages an isolated on-disk directory a test can open one or more graph
/// stores inside.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    /// Create an empty workspace.
    pub fn empty() -> Result<Self> {
        let dir = TempDir::new().context("failed to create temp directory")?;
        Ok(Self { dir })
    }

    /// Path to a (not yet created) store file with the given name.
    pub fn db_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Opens a store backed by `db_name`, writing to `write_branch` and
    /// reading from `read_branches`.
    pub fn open_store(
        &self,
        db_name: &str,
        write_branch: &str,
        read_branches: &[&str],
    ) -> Result<GraphStore> {
        let branches: Vec<String> = read_branches.iter().map(|s| s.to_string()).collect();
        Ok(GraphStore::open(self.db_path(db_name), write_branch, branches)?)
    }
}

/// Builds a minimal `Node`, defaulting every field a scenario doesn't care about.
pub fn node(id: &str, kind: NodeType, name: &str, file_path: &str) -> Node {
    Node {
        id: id.to_string(),
        r#type: kind,
        name: name.to_string(),
        qualified_name: String::new(),
        file_path: file_path.to_string(),
        package: String::new(),
        language: String::new(),
        line: 0,
        end_line: 0,
        exported: false,
        signature: String::new(),
        doc_comment: String::new(),
        properties: BTreeMap::new(),
        metrics: BTreeMap::new(),
    }
}

/// Builds a minimal `Edge` with the conventional `source-type-target` id.
pub fn edge(source_id: &str, kind: EdgeType, target_id: &str) -> Edge {
    Edge {
        id: codeeagle_graph::compute_edge_id(source_id, kind, target_id),
        r#type: kind,
        source_id: source_id.to_string(),
        target_id: target_id.to_string(),
        properties: BTreeMap::new(),
    }
}
