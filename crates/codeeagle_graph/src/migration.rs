//! Absolute-to-relative `filePath` migration, run across every branch.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::id;
use crate::kv::Kv;
use crate::query;
use crate::store;
use crate::types::{Edge, Node, NodeFilter, NodeType};

/// Outcome of a `migrate_abs_to_rel_paths` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationReport {
    pub dry_run: bool,
    pub nodes_scanned: u64,
    pub nodes_migrated: u64,
    pub edges_scanned: u64,
    pub edges_remapped: u64,
    pub branches_touched: Vec<String>,
    /// `(branch, error message)` for branches that failed; migration
    /// continues with the remaining branches rather than aborting.
    pub branch_errors: Vec<(String, String)>,
}

/// Rewrites absolute `filePath`s to paths relative to whichever of
/// `repo_roots` matches first, across every branch in the store, recomputing
/// node ids (and the edge ids and endpoints that reference them) to match.
///
/// Each branch is migrated independently: a failure on one branch is
/// recorded in [`MigrationReport::branch_errors`] and does not prevent the
/// remaining branches from being processed. When `dry_run` is `true`, no
/// writes happen; the report still reflects what would have changed.
pub fn migrate_abs_to_rel_paths(
    kv: &Kv,
    repo_roots: &[String],
    dry_run: bool,
    batch_size: Option<usize>,
    cancel: &CancellationToken,
) -> Result<MigrationReport> {
    let mut report = MigrationReport {
        dry_run,
        ..Default::default()
    };

    for branch in kv.distinct_branches()? {
        cancel.check("migrate_abs_to_rel_paths")?;
        match migrate_branch(kv, &branch, repo_roots, dry_run, batch_size, cancel) {
            Ok(branch_report) => {
                report.nodes_scanned += branch_report.nodes_scanned;
                report.nodes_migrated += branch_report.nodes_migrated;
                report.edges_scanned += branch_report.edges_scanned;
                report.edges_remapped += branch_report.edges_remapped;
                if branch_report.nodes_migrated > 0 || branch_report.edges_remapped > 0 {
                    report.branches_touched.push(branch.clone());
                }
                info!(
                    branch = %branch,
                    nodes_migrated = branch_report.nodes_migrated,
                    edges_remapped = branch_report.edges_remapped,
                    dry_run,
                    "migrated branch"
                );
            }
            Err(e) => {
                warn!(branch = %branch, error = %e, "branch migration failed, continuing");
                report.branch_errors.push((branch, e.to_string()));
            }
        }
    }

    Ok(report)
}

fn relativize(file_path: &str, repo_roots: &[String]) -> Option<String> {
    for root in repo_roots {
        let root = root.trim_end_matches('/');
        if root.is_empty() {
            continue;
        }
        if file_path == root {
            return Some(String::new());
        }
        let prefix = format!("{root}/");
        if let Some(rest) = file_path.strip_prefix(&prefix) {
            return Some(rest.to_string());
        }
    }
    None
}

struct BranchReport {
    nodes_scanned: u64,
    nodes_migrated: u64,
    edges_scanned: u64,
    edges_remapped: u64,
}

fn migrate_branch(
    kv: &Kv,
    branch: &str,
    repo_roots: &[String],
    dry_run: bool,
    batch_size: Option<usize>,
    cancel: &CancellationToken,
) -> Result<BranchReport> {
    let nodes = query::query_nodes(kv, branch, &NodeFilter::all(), cancel)?;
    let mut id_map: HashMap<String, String> = HashMap::new();
    let mut node_rewrites: Vec<(String, Node)> = Vec::new();

    for node in &nodes {
        cancel.check("migrate_branch:scan_nodes")?;
        let Some(rel) = relativize(&node.file_path, repo_roots) else {
            continue;
        };
        let new_name = if node.r#type == NodeType::File {
            rel.clone()
        } else {
            node.name.clone()
        };
        let new_id = id::compute_node_id(node.r#type, &rel, &new_name);
        if new_id == node.id && rel == node.file_path && new_name == node.name {
            continue;
        }
        let mut new_node = node.clone();
        new_node.id = new_id.clone();
        new_node.file_path = rel;
        new_node.name = new_name;
        id_map.insert(node.id.clone(), new_id);
        node_rewrites.push((node.id.clone(), new_node));
    }

    let edges = query::all_edges(kv, branch, cancel)?;
    let mut edge_rewrites: Vec<(String, Edge)> = Vec::new();

    for edge in &edges {
        cancel.check("migrate_branch:scan_edges")?;
        let new_source = id_map.get(&edge.source_id).cloned();
        let new_target = id_map.get(&edge.target_id).cloned();
        if new_source.is_none() && new_target.is_none() {
            continue;
        }
        let source_id = new_source.unwrap_or_else(|| edge.source_id.clone());
        let target_id = new_target.unwrap_or_else(|| edge.target_id.clone());
        let new_id = id::compute_edge_id(&source_id, edge.r#type, &target_id);
        let mut new_edge = edge.clone();
        new_edge.id = new_id;
        new_edge.source_id = source_id;
        new_edge.target_id = target_id;
        edge_rewrites.push((edge.id.clone(), new_edge));
    }

    let report = BranchReport {
        nodes_scanned: nodes.len() as u64,
        nodes_migrated: node_rewrites.len() as u64,
        edges_scanned: edges.len() as u64,
        edges_remapped: edge_rewrites.len() as u64,
    };

    if dry_run {
        return Ok(report);
    }

    for chunk in node_rewrites.chunks(batch_size.unwrap_or(usize::MAX).max(1)) {
        cancel.check("migrate_branch:apply_nodes")?;
        store::apply_node_rewrites(kv, branch, chunk, cancel)?;
    }
    for chunk in edge_rewrites.chunks(batch_size.unwrap_or(usize::MAX).max(1)) {
        cancel.check("migrate_branch:apply_edges")?;
        store::apply_edge_rewrites(kv, branch, chunk, cancel)?;
    }

    Ok(report)
}
