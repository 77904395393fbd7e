//! Layered Store: a `main` + `local` overlay over two separate backing
//! stores, sharing the Branch Layer's first-wins merge rule but fixed to
//! exactly two sides.

use std::collections::HashSet;
use std::path::Path;

use crate::cancel::CancellationToken;
use crate::config::GraphConfig;
use crate::error::Result;
use crate::exportimport::{self, ImportOutcome};
use crate::query;
use crate::store;
use crate::types::{Direction, Edge, EdgeType, GraphStats, Node, NodeFilter};
use crate::kv::Kv;

const MAIN_BRANCH: &str = "main";
const LOCAL_BRANCH: &str = "local";

/// Two-store overlay: writes land in `local`; reads merge `local` over
/// `main` with `local` winning any id present in both.
pub struct LayeredStore {
    main: Kv,
    local: Kv,
    config: GraphConfig,
}

impl LayeredStore {
    /// Opens (or creates) the `main` and `local` backing stores with default
    /// configuration.
    pub fn open(main_path: impl AsRef<Path>, local_path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(main_path, local_path, GraphConfig::default())
    }

    /// Opens (or creates) the `main` and `local` backing stores with
    /// explicit configuration.
    pub fn open_with_config(
        main_path: impl AsRef<Path>,
        local_path: impl AsRef<Path>,
        config: GraphConfig,
    ) -> Result<Self> {
        Ok(Self {
            main: Kv::open(main_path)?,
            local: Kv::open(local_path)?,
            config,
        })
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn add_node(&self, node: &Node, cancel: &CancellationToken) -> Result<()> {
        store::add_node(&self.local, LOCAL_BRANCH, node, cancel)
    }

    pub fn update_node(&self, node: &Node, cancel: &CancellationToken) -> Result<()> {
        store::update_node(&self.local, LOCAL_BRANCH, node, cancel)
    }

    pub fn delete_node(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        store::delete_node(&self.local, LOCAL_BRANCH, id, cancel)
    }

    pub fn delete_by_file(&self, file_path: &str, cancel: &CancellationToken) -> Result<u64> {
        store::delete_by_file(&self.local, LOCAL_BRANCH, file_path, cancel)
    }

    pub fn add_edge(&self, edge: &Edge, cancel: &CancellationToken) -> Result<()> {
        store::add_edge(&self.local, LOCAL_BRANCH, edge, cancel)
    }

    pub fn delete_edge(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        store::delete_edge(&self.local, LOCAL_BRANCH, id, cancel)
    }

    /// Reads a node by id, checking `local` then `main`.
    pub fn get_node(&self, id: &str, cancel: &CancellationToken) -> Result<Option<Node>> {
        if let Some(node) = store::get_node(&self.local, LOCAL_BRANCH, id, cancel)? {
            return Ok(Some(node.with_graph_source(LOCAL_BRANCH)));
        }
        if let Some(node) = store::get_node(&self.main, MAIN_BRANCH, id, cancel)? {
            return Ok(Some(node.with_graph_source(MAIN_BRANCH)));
        }
        Ok(None)
    }

    /// Reads an edge by id, checking `local` then `main`.
    pub fn get_edge(&self, id: &str, cancel: &CancellationToken) -> Result<Option<Edge>> {
        if let Some(edge) = store::get_edge(&self.local, LOCAL_BRANCH, id, cancel)? {
            return Ok(Some(edge.with_graph_source(LOCAL_BRANCH)));
        }
        if let Some(edge) = store::get_edge(&self.main, MAIN_BRANCH, id, cancel)? {
            return Ok(Some(edge.with_graph_source(MAIN_BRANCH)));
        }
        Ok(None)
    }

    /// Queries nodes matching `filter`, merging `local` over `main` with
    /// `local` winning on id conflicts.
    pub fn query_nodes(&self, filter: &NodeFilter, cancel: &CancellationToken) -> Result<Vec<Node>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for node in query::query_nodes(&self.local, LOCAL_BRANCH, filter, cancel)? {
            if seen.insert(node.id.clone()) {
                out.push(node.with_graph_source(LOCAL_BRANCH));
            }
        }
        for node in query::query_nodes(&self.main, MAIN_BRANCH, filter, cancel)? {
            if seen.insert(node.id.clone()) {
                out.push(node.with_graph_source(MAIN_BRANCH));
            }
        }
        Ok(out)
    }

    /// Returns every edge touching `node_id`, restricted to `edge_type` when
    /// given, merging `local` over `main`.
    pub fn get_edges(
        &self,
        node_id: &str,
        edge_type: Option<EdgeType>,
        direction: Direction,
        cancel: &CancellationToken,
    ) -> Result<Vec<Edge>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for edge in query::get_edges(&self.local, LOCAL_BRANCH, node_id, edge_type, direction, cancel)? {
            if seen.insert(edge.id.clone()) {
                out.push(edge.with_graph_source(LOCAL_BRANCH));
            }
        }
        for edge in query::get_edges(&self.main, MAIN_BRANCH, node_id, edge_type, direction, cancel)? {
            if seen.insert(edge.id.clone()) {
                out.push(edge.with_graph_source(MAIN_BRANCH));
            }
        }
        Ok(out)
    }

    /// Returns the distinct neighbor nodes of `node_id`, restricted to
    /// `edge_type` when given, resolved through the merged
    /// (`local`-over-`main`) node lookup.
    pub fn get_neighbors(
        &self,
        node_id: &str,
        edge_type: Option<EdgeType>,
        direction: Direction,
        cancel: &CancellationToken,
    ) -> Result<Vec<Node>> {
        let edges = self.get_edges(node_id, edge_type, direction, cancel)?;
        let mut neighbor_ids = Vec::new();
        let mut seen = HashSet::new();
        for edge in &edges {
            if matches!(direction, Direction::Outgoing | Direction::Both) && edge.source_id == node_id {
                if seen.insert(edge.target_id.clone()) {
                    neighbor_ids.push(edge.target_id.clone());
                }
            }
            if matches!(direction, Direction::Incoming | Direction::Both) && edge.target_id == node_id {
                if seen.insert(edge.source_id.clone()) {
                    neighbor_ids.push(edge.source_id.clone());
                }
            }
        }
        let mut out = Vec::new();
        for id in neighbor_ids {
            if let Some(node) = self.get_node(&id, cancel)? {
                out.push(node);
            }
        }
        Ok(out)
    }

    /// Aggregate counts across `main` and `local`, added together rather
    /// than deduplicated by id. A node overridden in `local` is therefore
    /// counted twice here even though `get_node`/`query_nodes` only ever
    /// surface its `local` copy; this mirrors the documented discrepancy
    /// between the branch-merge view and the layered-store stats view and
    /// is intentionally left unresolved rather than silently deduplicated.
    pub fn stats(&self, cancel: &CancellationToken) -> Result<GraphStats> {
        let mut stats = query::branch_stats(&self.main, MAIN_BRANCH, cancel)?;
        stats.add_assign(&query::branch_stats(&self.local, LOCAL_BRANCH, cancel)?);
        Ok(stats)
    }

    /// Serializes `local` to NDJSON.
    pub fn export_local(&self, cancel: &CancellationToken) -> Result<String> {
        exportimport::export(&self.local, &[LOCAL_BRANCH.to_string()], cancel)
    }

    /// Imports an NDJSON document into `local`, clearing it first.
    pub fn import_into_local(&self, ndjson: &str, cancel: &CancellationToken) -> Result<ImportOutcome> {
        exportimport::import_into_branch(
            &self.local,
            LOCAL_BRANCH,
            ndjson,
            self.config.import_line_buffer_limit,
            cancel,
        )
    }

    pub fn close(self) {}
}
