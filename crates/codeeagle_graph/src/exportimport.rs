//! NDJSON export/import, with auto-detection of the legacy (branch-less)
//! record format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::error::{GraphError, Result};
use crate::key;
use crate::kv::Kv;
use crate::query;
use crate::store;
use crate::types::{Edge, Node, NodeFilter};

/// Batch size used for the bulk branch clears this module performs on
/// import; not tied to `GraphConfig::delete_batch_size` since a full-store
/// legacy import clears branches this module discovers itself.
const CLEAR_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RecordKind {
    Node,
    Edge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Record {
    kind: RecordKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    data: serde_json::Value,
}

/// Summary of an `import`/`import_into_branch` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    pub branches: Vec<String>,
    pub nodes_imported: u64,
    pub edges_imported: u64,
    /// The branch name embedded in the stream's first record, if any.
    pub source_branch: Option<String>,
}

fn split_lines_checked(ndjson: &str, line_buffer_limit: usize) -> Result<Vec<&str>> {
    let mut out = Vec::new();
    for line in ndjson.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.len() > line_buffer_limit {
            return Err(GraphError::InvalidInput(format!(
                "NDJSON line of {} bytes exceeds the {}-byte limit",
                line.len(),
                line_buffer_limit
            )));
        }
        out.push(line);
    }
    Ok(out)
}

fn parse_records(ndjson: &str, line_buffer_limit: usize) -> Result<Vec<Record>> {
    split_lines_checked(ndjson, line_buffer_limit)?
        .into_iter()
        .map(|line| {
            serde_json::from_str::<Record>(line)
                .map_err(|e| GraphError::InvalidInput(format!("malformed NDJSON record: {e}")))
        })
        .collect()
}

fn record_to_node(rec: &Record) -> Result<Node> {
    serde_json::from_value(rec.data.clone())
        .map_err(|e| GraphError::Deserialization(e.to_string()))
}

fn record_to_edge(rec: &Record) -> Result<Edge> {
    serde_json::from_value(rec.data.clone())
        .map_err(|e| GraphError::Deserialization(e.to_string()))
}

fn node_record(branch: &str, node: Node) -> Result<String> {
    let rec = Record {
        kind: RecordKind::Node,
        branch: Some(branch.to_string()),
        data: serde_json::to_value(node.without_graph_source())
            .map_err(|e| GraphError::Serialization(e.to_string()))?,
    };
    serde_json::to_string(&rec).map_err(|e| GraphError::Serialization(e.to_string()))
}

fn edge_record(branch: &str, edge: Edge) -> Result<String> {
    let rec = Record {
        kind: RecordKind::Edge,
        branch: Some(branch.to_string()),
        data: serde_json::to_value(edge.without_graph_source())
            .map_err(|e| GraphError::Serialization(e.to_string()))?,
    };
    serde_json::to_string(&rec).map_err(|e| GraphError::Serialization(e.to_string()))
}

/// Serializes every node and edge in `branches` to NDJSON, one record per
/// line, stripping `graphSource` (a read-time decoration, never persisted)
/// from each record's properties.
pub fn export(kv: &Kv, branches: &[String], cancel: &CancellationToken) -> Result<String> {
    let mut lines = Vec::new();
    for branch in branches {
        cancel.check("export")?;
        for node in query::query_nodes(kv, branch, &NodeFilter::all(), cancel)? {
            lines.push(node_record(branch, node)?);
        }
        for edge in query::all_edges(kv, branch, cancel)? {
            lines.push(edge_record(branch, edge)?);
        }
    }
    Ok(lines.join("\n"))
}

/// Imports an NDJSON document. Detects the legacy (branch-less) record
/// format by checking whether the first record carries a `branch` field.
///
/// - Branch-aware documents: each referenced branch is cleared via a
///   `DeleteByBranch`-equivalent sweep, then reloaded from the matching
///   records. Records missing a `branch` fall back to the first record's
///   branch.
/// - Legacy documents: the entire store is cleared and every record is
///   loaded into `write_branch`.
pub fn import(
    kv: &Kv,
    write_branch: &str,
    ndjson: &str,
    line_buffer_limit: usize,
    cancel: &CancellationToken,
) -> Result<ImportOutcome> {
    let records = parse_records(ndjson, line_buffer_limit)?;
    if records.is_empty() {
        return Ok(ImportOutcome::default());
    }

    if records[0].branch.is_some() {
        let default_branch = records[0].branch.clone().unwrap();
        let source_branch = Some(default_branch.clone());
        let mut by_branch: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
        for rec in &records {
            let branch = rec.branch.clone().unwrap_or_else(|| default_branch.clone());
            by_branch.entry(branch).or_default().push(rec);
        }

        let mut outcome = ImportOutcome::default();
        for (branch, recs) in by_branch {
            cancel.check("import")?;
            kv.delete_prefix_batched(&key::branch_prefix(&branch), CLEAR_BATCH_SIZE, cancel)?;
            for rec in recs {
                cancel.check("import")?;
                match rec.kind {
                    RecordKind::Node => {
                        store::add_node(kv, &branch, &record_to_node(rec)?, cancel)?;
                        outcome.nodes_imported += 1;
                    }
                    RecordKind::Edge => {
                        store::add_edge(kv, &branch, &record_to_edge(rec)?, cancel)?;
                        outcome.edges_imported += 1;
                    }
                }
            }
            outcome.branches.push(branch);
        }
        outcome.source_branch = source_branch;
        Ok(outcome)
    } else {
        for branch in kv.distinct_branches()? {
            cancel.check("import")?;
            kv.delete_prefix_batched(&key::branch_prefix(&branch), CLEAR_BATCH_SIZE, cancel)?;
        }
        let mut outcome = ImportOutcome {
            branches: vec![write_branch.to_string()],
            ..Default::default()
        };
        for rec in &records {
            cancel.check("import")?;
            match rec.kind {
                RecordKind::Node => {
                    store::add_node(kv, write_branch, &record_to_node(rec)?, cancel)?;
                    outcome.nodes_imported += 1;
                }
                RecordKind::Edge => {
                    store::add_edge(kv, write_branch, &record_to_edge(rec)?, cancel)?;
                    outcome.edges_imported += 1;
                }
            }
        }
        Ok(outcome)
    }
}

/// Clears `branch` and imports every record in `ndjson` into it, ignoring
/// any embedded `branch` field on the records themselves.
pub fn import_into_branch(
    kv: &Kv,
    branch: &str,
    ndjson: &str,
    line_buffer_limit: usize,
    cancel: &CancellationToken,
) -> Result<ImportOutcome> {
    let records = parse_records(ndjson, line_buffer_limit)?;
    let source_branch = records.first().and_then(|r| r.branch.clone());

    kv.delete_prefix_batched(&key::branch_prefix(branch), CLEAR_BATCH_SIZE, cancel)?;

    let mut outcome = ImportOutcome {
        branches: vec![branch.to_string()],
        source_branch,
        ..Default::default()
    };
    for rec in &records {
        cancel.check("import_into_branch")?;
        match rec.kind {
            RecordKind::Node => {
                store::add_node(kv, branch, &record_to_node(rec)?, cancel)?;
                outcome.nodes_imported += 1;
            }
            RecordKind::Edge => {
                store::add_edge(kv, branch, &record_to_edge(rec)?, cancel)?;
                outcome.edges_imported += 1;
            }
        }
    }
    Ok(outcome)
}

/// Peeks the branch name embedded in the first record of `ndjson`, without
/// importing anything. Returns `None` for an empty document or a legacy
/// (branch-less) document.
pub fn read_export_branch(ndjson: &str, line_buffer_limit: usize) -> Result<Option<String>> {
    let lines = split_lines_checked(ndjson, line_buffer_limit)?;
    let Some(first) = lines.first() else {
        return Ok(None);
    };
    let rec: Record = serde_json::from_str(first)
        .map_err(|e| GraphError::InvalidInput(format!("malformed NDJSON record: {e}")))?;
    Ok(rec.branch)
}
