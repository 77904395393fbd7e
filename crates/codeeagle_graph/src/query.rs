//! Query Layer: filtered node queries, edge/neighbor traversal, and branch
//! statistics, all scoped to a single branch.

use std::collections::BTreeSet;

use crate::cancel::CancellationToken;
use crate::error::{GraphError, Result};
use crate::key;
use crate::kv::Kv;
use crate::types::{Direction, Edge, EdgeType, GraphStats, Node, NodeFilter};

fn decode_node(bytes: &[u8]) -> Result<Node> {
    postcard::from_bytes(bytes).map_err(|e| GraphError::Deserialization(e.to_string()))
}

fn decode_edge(bytes: &[u8]) -> Result<Edge> {
    postcard::from_bytes(bytes).map_err(|e| GraphError::Deserialization(e.to_string()))
}

fn node_matches(node: &Node, filter: &NodeFilter) -> bool {
    if let Some(t) = filter.r#type {
        if node.r#type != t {
            return false;
        }
    }
    if let Some(path) = &filter.file_path {
        if &node.file_path != path {
            return false;
        }
    }
    if let Some(pkg) = &filter.package {
        if &node.package != pkg {
            return false;
        }
    }
    if let Some(lang) = &filter.language {
        if &node.language != lang {
            return false;
        }
    }
    if let Some(pattern) = &filter.name_pattern {
        if !glob_match(pattern, &node.name) {
            return false;
        }
    }
    if let Some(exported) = filter.exported {
        if node.exported != exported {
            return false;
        }
    }
    for (k, v) in &filter.properties {
        if node.properties.get(k) != Some(v) {
            return false;
        }
    }
    true
}

/// Selects nodes matching `filter`, using whichever secondary index is most
/// selective (`filePath`, then `type`, then `package`), falling back to a
/// full primary scan when none of those are set.
pub fn query_nodes(
    kv: &Kv,
    branch: &str,
    filter: &NodeFilter,
    cancel: &CancellationToken,
) -> Result<Vec<Node>> {
    cancel.check("query_nodes")?;

    let candidate_ids: Option<Vec<String>> = if let Some(path) = &filter.file_path {
        Some(ids_from_index(kv, &key::idx_file_prefix(branch, path))?)
    } else if let Some(t) = filter.r#type {
        Some(ids_from_index(kv, &key::idx_type_prefix(branch, t))?)
    } else if let Some(pkg) = &filter.package {
        Some(ids_from_index(kv, &key::idx_pkg_prefix(branch, pkg))?)
    } else {
        None
    };

    let mut out = Vec::new();
    match candidate_ids {
        Some(ids) => {
            for id in ids {
                cancel.check("query_nodes")?;
                if let Some(bytes) = kv.get(&key::node_key(branch, &id))? {
                    let node = decode_node(&bytes)?;
                    if node_matches(&node, filter) {
                        out.push(node);
                    }
                }
                // A missing node behind a matched index entry is a
                // transient dangling index; skip it rather than error.
            }
        }
        None => {
            for (_, bytes) in kv.scan_prefix(&key::node_prefix(branch))? {
                cancel.check("query_nodes")?;
                let node = decode_node(&bytes)?;
                if node_matches(&node, filter) {
                    out.push(node);
                }
            }
        }
    }
    Ok(out)
}

fn ids_from_index(kv: &Kv, prefix: &[u8]) -> Result<Vec<String>> {
    Ok(kv
        .scan_prefix(prefix)?
        .into_iter()
        .filter_map(|(k, _)| key::decode_trailing_id(&k).map(str::to_string))
        .collect())
}

/// Returns every edge touching `node_id` in the requested `direction`,
/// restricted to `edge_type` when given.
pub fn get_edges(
    kv: &Kv,
    branch: &str,
    node_id: &str,
    edge_type: Option<EdgeType>,
    direction: Direction,
    cancel: &CancellationToken,
) -> Result<Vec<Edge>> {
    cancel.check("get_edges")?;
    let mut ids = BTreeSet::new();
    if matches!(direction, Direction::Outgoing | Direction::Both) {
        let prefix = match edge_type {
            Some(t) => key::idx_edge_type_prefix(branch, node_id, t),
            None => key::idx_edge_prefix(branch, node_id),
        };
        ids.extend(ids_from_index(kv, &prefix)?);
    }
    if matches!(direction, Direction::Incoming | Direction::Both) {
        let prefix = match edge_type {
            Some(t) => key::idx_redge_type_prefix(branch, node_id, t),
            None => key::idx_redge_prefix(branch, node_id),
        };
        ids.extend(ids_from_index(kv, &prefix)?);
    }

    let mut out = Vec::new();
    for id in ids {
        if let Some(bytes) = kv.get(&key::edge_key(branch, &id))? {
            out.push(decode_edge(&bytes)?);
        }
    }
    Ok(out)
}

/// Returns the distinct nodes reachable from `node_id` in one hop, in the
/// requested `direction`, restricted to `edge_type` when given.
pub fn get_neighbors(
    kv: &Kv,
    branch: &str,
    node_id: &str,
    edge_type: Option<EdgeType>,
    direction: Direction,
    cancel: &CancellationToken,
) -> Result<Vec<Node>> {
    cancel.check("get_neighbors")?;
    let edges = get_edges(kv, branch, node_id, edge_type, direction, cancel)?;
    let mut neighbor_ids = BTreeSet::new();
    for edge in &edges {
        if matches!(direction, Direction::Outgoing | Direction::Both) && edge.source_id == node_id {
            neighbor_ids.insert(edge.target_id.clone());
        }
        if matches!(direction, Direction::Incoming | Direction::Both) && edge.target_id == node_id {
            neighbor_ids.insert(edge.source_id.clone());
        }
    }

    let mut out = Vec::new();
    for id in neighbor_ids {
        if let Some(bytes) = kv.get(&key::node_key(branch, &id))? {
            out.push(decode_node(&bytes)?);
        }
    }
    Ok(out)
}

/// Returns every edge stored in `branch`, in key order.
pub fn all_edges(kv: &Kv, branch: &str, cancel: &CancellationToken) -> Result<Vec<Edge>> {
    cancel.check("all_edges")?;
    let mut out = Vec::new();
    for (_, bytes) in kv.scan_prefix(&key::edge_prefix(branch))? {
        cancel.check("all_edges")?;
        out.push(decode_edge(&bytes)?);
    }
    Ok(out)
}

/// Aggregates node and edge counts for one branch by scanning its primary
/// records directly (not the secondary indexes, which may carry transient
/// dangling entries).
pub fn branch_stats(kv: &Kv, branch: &str, cancel: &CancellationToken) -> Result<GraphStats> {
    cancel.check("branch_stats")?;
    let mut stats = GraphStats::default();
    for (_, bytes) in kv.scan_prefix(&key::node_prefix(branch))? {
        cancel.check("branch_stats")?;
        let node = decode_node(&bytes)?;
        stats.total_nodes += 1;
        *stats.nodes_by_type.entry(node.r#type).or_default() += 1;
    }
    for (_, bytes) in kv.scan_prefix(&key::edge_prefix(branch))? {
        cancel.check("branch_stats")?;
        let edge = decode_edge(&bytes)?;
        stats.total_edges += 1;
        *stats.edges_by_type.entry(edge.r#type).or_default() += 1;
    }
    Ok(stats)
}

/// Matches `text` against a small glob `pattern` supporting `*` (any run of
/// characters), `?` (any single character), and `[...]` character classes.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    glob_match_inner(&p, &t)
}

fn glob_match_inner(p: &[char], t: &[char]) -> bool {
    match p.first() {
        None => t.is_empty(),
        Some('*') => {
            glob_match_inner(&p[1..], t) || (!t.is_empty() && glob_match_inner(p, &t[1..]))
        }
        Some('?') => !t.is_empty() && glob_match_inner(&p[1..], &t[1..]),
        Some('[') => {
            let Some(close) = p.iter().position(|&c| c == ']') else {
                return !t.is_empty() && p[0] == t[0] && glob_match_inner(&p[1..], &t[1..]);
            };
            if t.is_empty() {
                return false;
            }
            let class = &p[1..close];
            let (negate, class) = match class.first() {
                Some('!') | Some('^') => (true, &class[1..]),
                _ => (false, class),
            };
            let hit = class.contains(&t[0]);
            if hit == negate {
                return false;
            }
            glob_match_inner(&p[close + 1..], &t[1..])
        }
        Some(c) => !t.is_empty() && *c == t[0] && glob_match_inner(&p[1..], &t[1..]),
    }
}
