//! Branch Layer: the crate's main entry point, a single-store API over N
//! named branches with first-branch-wins merge semantics.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, instrument};

use crate::cancel::CancellationToken;
use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use crate::exportimport::{self, ImportOutcome};
use crate::key;
use crate::kv::Kv;
use crate::migration::{self, MigrationReport};
use crate::query;
use crate::store;
use crate::types::{Direction, Edge, EdgeType, GraphStats, Node, NodeFilter};

/// A branch-namespaced code knowledge graph backed by one embedded
/// key-value store.
///
/// Writes always target `write_branch`. Reads merge every branch in
/// `read_branches`, in order, with the first branch that defines a given id
/// winning — later branches never override an id already seen.
pub struct GraphStore {
    kv: Kv,
    write_branch: String,
    read_branches: Vec<String>,
    config: GraphConfig,
}

impl GraphStore {
    /// Opens (or creates) a store at `path` with default configuration.
    pub fn open(
        path: impl AsRef<Path>,
        write_branch: impl Into<String>,
        read_branches: Vec<String>,
    ) -> Result<Self> {
        Self::open_with_config(path, write_branch, read_branches, GraphConfig::default())
    }

    /// Opens (or creates) a store at `path` with explicit configuration.
    pub fn open_with_config(
        path: impl AsRef<Path>,
        write_branch: impl Into<String>,
        read_branches: Vec<String>,
        config: GraphConfig,
    ) -> Result<Self> {
        let write_branch = write_branch.into();
        if write_branch.is_empty() {
            return Err(GraphError::InvalidInput("write_branch must not be empty".into()));
        }
        let kv = Kv::open(path)?;
        debug!(write_branch = %write_branch, branches = ?read_branches, "opened graph store");
        Ok(Self {
            kv,
            write_branch,
            read_branches,
            config,
        })
    }

    pub fn write_branch(&self) -> &str {
        &self.write_branch
    }

    pub fn read_branches(&self) -> &[String] {
        &self.read_branches
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Inserts or overwrites a node in `write_branch`.
    pub fn add_node(&self, node: &Node, cancel: &CancellationToken) -> Result<()> {
        store::add_node(&self.kv, &self.write_branch, node, cancel)
    }

    /// Replaces an existing node in `write_branch`.
    pub fn update_node(&self, node: &Node, cancel: &CancellationToken) -> Result<()> {
        store::update_node(&self.kv, &self.write_branch, node, cancel)
    }

    /// Deletes a node (and cascades to its edges) from `write_branch`.
    pub fn delete_node(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        store::delete_node(&self.kv, &self.write_branch, id, cancel)
    }

    /// Deletes every node at `file_path` (and their edges) from `write_branch`.
    pub fn delete_by_file(&self, file_path: &str, cancel: &CancellationToken) -> Result<u64> {
        store::delete_by_file(&self.kv, &self.write_branch, file_path, cancel)
    }

    /// Inserts or overwrites an edge in `write_branch`.
    pub fn add_edge(&self, edge: &Edge, cancel: &CancellationToken) -> Result<()> {
        store::add_edge(&self.kv, &self.write_branch, edge, cancel)
    }

    /// Deletes an edge from `write_branch`.
    pub fn delete_edge(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        store::delete_edge(&self.kv, &self.write_branch, id, cancel)
    }

    /// Reads a node by id, checking `read_branches` in order. The returned
    /// node carries a `graphSource` property naming the branch it came from.
    pub fn get_node(&self, id: &str, cancel: &CancellationToken) -> Result<Option<Node>> {
        for branch in &self.read_branches {
            cancel.check("get_node")?;
            if let Some(node) = store::get_node(&self.kv, branch, id, cancel)? {
                return Ok(Some(node.with_graph_source(branch)));
            }
        }
        Ok(None)
    }

    /// Reads an edge by id, checking `read_branches` in order.
    pub fn get_edge(&self, id: &str, cancel: &CancellationToken) -> Result<Option<Edge>> {
        for branch in &self.read_branches {
            cancel.check("get_edge")?;
            if let Some(edge) = store::get_edge(&self.kv, branch, id, cancel)? {
                return Ok(Some(edge.with_graph_source(branch)));
            }
        }
        Ok(None)
    }

    /// Queries nodes matching `filter`, merging every read branch with
    /// first-branch-wins precedence by id.
    pub fn query_nodes(&self, filter: &NodeFilter, cancel: &CancellationToken) -> Result<Vec<Node>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for branch in &self.read_branches {
            cancel.check("query_nodes")?;
            for node in query::query_nodes(&self.kv, branch, filter, cancel)? {
                if seen.insert(node.id.clone()) {
                    out.push(node.with_graph_source(branch));
                }
            }
        }
        Ok(out)
    }

    /// Returns every edge touching `node_id`, restricted to `edge_type` when
    /// given, merging read branches with first-branch-wins precedence by
    /// edge id.
    pub fn get_edges(
        &self,
        node_id: &str,
        edge_type: Option<EdgeType>,
        direction: Direction,
        cancel: &CancellationToken,
    ) -> Result<Vec<Edge>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for branch in &self.read_branches {
            cancel.check("get_edges")?;
            for edge in query::get_edges(&self.kv, branch, node_id, edge_type, direction, cancel)? {
                if seen.insert(edge.id.clone()) {
                    out.push(edge.with_graph_source(branch));
                }
            }
        }
        Ok(out)
    }

    /// Returns the distinct neighbor nodes of `node_id`, restricted to
    /// `edge_type` when given, merging read branches with first-branch-wins
    /// precedence by id.
    pub fn get_neighbors(
        &self,
        node_id: &str,
        edge_type: Option<EdgeType>,
        direction: Direction,
        cancel: &CancellationToken,
    ) -> Result<Vec<Node>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for branch in &self.read_branches {
            cancel.check("get_neighbors")?;
            for node in query::get_neighbors(&self.kv, branch, node_id, edge_type, direction, cancel)? {
                if seen.insert(node.id.clone()) {
                    out.push(node.with_graph_source(branch));
                }
            }
        }
        Ok(out)
    }

    /// Aggregate stats across every read branch, deduplicated by id: a node
    /// or edge visible in two branches is counted once, attributed to the
    /// first branch that defines it.
    pub fn stats(&self, cancel: &CancellationToken) -> Result<GraphStats> {
        let mut seen_nodes = HashSet::new();
        let mut seen_edges = HashSet::new();
        let mut out = GraphStats::default();
        for branch in &self.read_branches {
            cancel.check("stats")?;
            for node in query::query_nodes(&self.kv, branch, &NodeFilter::all(), cancel)? {
                if seen_nodes.insert(node.id.clone()) {
                    out.total_nodes += 1;
                    *out.nodes_by_type.entry(node.r#type).or_default() += 1;
                }
            }
            for edge in query::all_edges(&self.kv, branch, cancel)? {
                if seen_edges.insert(edge.id.clone()) {
                    out.total_edges += 1;
                    *out.edges_by_type.entry(edge.r#type).or_default() += 1;
                }
            }
        }
        Ok(out)
    }

    /// Deletes every key belonging to `branch`, across every key class, in
    /// batches of `config().delete_batch_size`.
    #[instrument(skip(self, cancel))]
    pub fn delete_by_branch(&self, branch: &str, cancel: &CancellationToken) -> Result<u64> {
        let deleted = self.kv.delete_prefix_batched(
            &key::branch_prefix(branch),
            self.config.delete_batch_size,
            cancel,
        )?;
        debug!(deleted, "dropped branch");
        Ok(deleted)
    }

    /// Lists every branch name with at least one key in the store.
    pub fn list_branches(&self, cancel: &CancellationToken) -> Result<Vec<String>> {
        cancel.check("list_branches")?;
        self.kv.distinct_branches()
    }

    /// Serializes `write_branch` to NDJSON.
    pub fn export(&self, cancel: &CancellationToken) -> Result<String> {
        exportimport::export(&self.kv, std::slice::from_ref(&self.write_branch), cancel)
    }

    /// Serializes a single branch to NDJSON.
    pub fn export_branch(&self, branch: &str, cancel: &CancellationToken) -> Result<String> {
        exportimport::export(&self.kv, std::slice::from_ref(&branch.to_string()), cancel)
    }

    /// Imports an NDJSON document, auto-detecting legacy (branch-less)
    /// format. Branch-aware documents clear each referenced branch before
    /// loading it; legacy documents clear and reload `write_branch`.
    pub fn import(&self, ndjson: &str, cancel: &CancellationToken) -> Result<ImportOutcome> {
        exportimport::import(
            &self.kv,
            &self.write_branch,
            ndjson,
            self.config.import_line_buffer_limit,
            cancel,
        )
    }

    /// Imports every record in `ndjson` into `branch`, regardless of any
    /// embedded branch field, after clearing `branch` first.
    pub fn import_into_branch(
        &self,
        branch: &str,
        ndjson: &str,
        cancel: &CancellationToken,
    ) -> Result<ImportOutcome> {
        exportimport::import_into_branch(
            &self.kv,
            branch,
            ndjson,
            self.config.import_line_buffer_limit,
            cancel,
        )
    }

    /// Peeks the branch name embedded in the first record of `ndjson`,
    /// without importing anything.
    pub fn read_export_branch(&self, ndjson: &str) -> Result<Option<String>> {
        exportimport::read_export_branch(ndjson, self.config.import_line_buffer_limit)
    }

    /// Rewrites absolute `filePath`s to paths relative to whichever of
    /// `repo_roots` matches, across every branch in the store.
    pub fn migrate_abs_to_rel_paths(
        &self,
        repo_roots: &[String],
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> Result<MigrationReport> {
        migration::migrate_abs_to_rel_paths(
            &self.kv,
            repo_roots,
            dry_run,
            self.config.migration_batch_size,
            cancel,
        )
    }

    /// Consumes the store. The underlying database closes on drop; this
    /// exists to give callers an explicit, named point to release it.
    pub fn close(self) {}
}
