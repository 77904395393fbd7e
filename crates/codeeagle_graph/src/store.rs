//! Primary Store: CRUD for nodes and edges within one branch, maintaining
//! every secondary index in lockstep.

use std::collections::BTreeSet;

use redb::Table;

use crate::cancel::CancellationToken;
use crate::error::{GraphError, Result};
use crate::key;
use crate::kv::Kv;
use crate::types::{Edge, Node};

fn encode_node(node: &Node) -> Result<Vec<u8>> {
    postcard::to_allocvec(node).map_err(|e| GraphError::Serialization(e.to_string()))
}

fn decode_node(bytes: &[u8]) -> Result<Node> {
    postcard::from_bytes(bytes).map_err(|e| GraphError::Deserialization(e.to_string()))
}

fn encode_edge(edge: &Edge) -> Result<Vec<u8>> {
    postcard::to_allocvec(edge).map_err(|e| GraphError::Serialization(e.to_string()))
}

fn decode_edge(bytes: &[u8]) -> Result<Edge> {
    postcard::from_bytes(bytes).map_err(|e| GraphError::Deserialization(e.to_string()))
}

fn table_get(table: &Table<'_, &[u8], &[u8]>, key: &[u8]) -> Result<Option<Vec<u8>>> {
    table
        .get(key)
        .map_err(|e| GraphError::Backend(e.to_string()))
        .map(|v| v.map(|g| g.value().to_vec()))
}

fn table_insert(table: &mut Table<'_, &[u8], &[u8]>, key: &[u8], value: &[u8]) -> Result<()> {
    table
        .insert(key, value)
        .map_err(|e| GraphError::Backend(e.to_string()))?;
    Ok(())
}

fn table_remove(table: &mut Table<'_, &[u8], &[u8]>, key: &[u8]) -> Result<()> {
    table
        .remove(key)
        .map_err(|e| GraphError::Backend(e.to_string()))?;
    Ok(())
}

fn insert_node_indexes(table: &mut Table<'_, &[u8], &[u8]>, branch: &str, node: &Node) -> Result<()> {
    table_insert(table, &key::idx_type_key(branch, node.r#type, &node.id), b"")?;
    if !node.file_path.is_empty() {
        table_insert(table, &key::idx_file_key(branch, &node.file_path, &node.id), b"")?;
    }
    if !node.package.is_empty() {
        table_insert(table, &key::idx_pkg_key(branch, &node.package, &node.id), b"")?;
    }
    if let Some(role) = node.arch_role() {
        table_insert(table, &key::idx_role_key(branch, role, &node.id), b"")?;
    }
    Ok(())
}

fn remove_node_indexes(table: &mut Table<'_, &[u8], &[u8]>, branch: &str, node: &Node) -> Result<()> {
    table_remove(table, &key::idx_type_key(branch, node.r#type, &node.id))?;
    if !node.file_path.is_empty() {
        table_remove(table, &key::idx_file_key(branch, &node.file_path, &node.id))?;
    }
    if !node.package.is_empty() {
        table_remove(table, &key::idx_pkg_key(branch, &node.package, &node.id))?;
    }
    if let Some(role) = node.arch_role() {
        table_remove(table, &key::idx_role_key(branch, role, &node.id))?;
    }
    Ok(())
}

/// Inserts a node, overwriting any existing node with the same id (silent,
/// per the engine's no-conflict-detection policy).
pub fn add_node(kv: &Kv, branch: &str, node: &Node, cancel: &CancellationToken) -> Result<()> {
    cancel.check("add_node")?;
    let bytes = encode_node(node)?;
    kv.write(|table| {
        if let Some(old) = table_get(table, &key::node_key(branch, &node.id))? {
            remove_node_indexes(table, branch, &decode_node(&old)?)?;
        }
        insert_node_indexes(table, branch, node)?;
        table_insert(table, &key::node_key(branch, &node.id), &bytes)
    })
}

/// Replaces an existing node, rewriting any secondary index whose value
/// changed. Fails with [`GraphError::NotFound`] if the node doesn't exist.
pub fn update_node(kv: &Kv, branch: &str, node: &Node, cancel: &CancellationToken) -> Result<()> {
    cancel.check("update_node")?;
    let bytes = encode_node(node)?;
    let id = node.id.clone();
    kv.write(|table| {
        let existing = table_get(table, &key::node_key(branch, &id))?
            .ok_or_else(|| GraphError::NotFound(id.clone()))?;
        let old = decode_node(&existing)?;
        remove_node_indexes(table, branch, &old)?;
        insert_node_indexes(table, branch, node)?;
        table_insert(table, &key::node_key(branch, &id), &bytes)
    })
}

/// Reads a node by id, if present in `branch`.
pub fn get_node(kv: &Kv, branch: &str, id: &str, cancel: &CancellationToken) -> Result<Option<Node>> {
    cancel.check("get_node")?;
    match kv.get(&key::node_key(branch, id))? {
        Some(bytes) => Ok(Some(decode_node(&bytes)?)),
        None => Ok(None),
    }
}

/// Reads an edge by id, if present in `branch`.
pub fn get_edge(kv: &Kv, branch: &str, id: &str, cancel: &CancellationToken) -> Result<Option<Edge>> {
    cancel.check("get_edge")?;
    match kv.get(&key::edge_key(branch, id))? {
        Some(bytes) => Ok(Some(decode_edge(&bytes)?)),
        None => Ok(None),
    }
}

/// Inserts an edge, overwriting any existing edge with the same id.
pub fn add_edge(kv: &Kv, branch: &str, edge: &Edge, cancel: &CancellationToken) -> Result<()> {
    cancel.check("add_edge")?;
    let bytes = encode_edge(edge)?;
    kv.write(|table| {
        if let Some(old) = table_get(table, &key::edge_key(branch, &edge.id))? {
            let old = decode_edge(&old)?;
            table_remove(table, &key::idx_edge_key(branch, &old.source_id, old.r#type, &old.id))?;
            table_remove(table, &key::idx_redge_key(branch, &old.target_id, old.r#type, &old.id))?;
        }
        table_insert(
            table,
            &key::idx_edge_key(branch, &edge.source_id, edge.r#type, &edge.id),
            b"",
        )?;
        table_insert(
            table,
            &key::idx_redge_key(branch, &edge.target_id, edge.r#type, &edge.id),
            b"",
        )?;
        table_insert(table, &key::edge_key(branch, &edge.id), &bytes)
    })
}

/// Deletes an edge and both of its directional index entries. Fails with
/// [`GraphError::NotFound`] if the edge doesn't exist, unless
/// `tolerate_missing` is set (used by cascading deletes sweeping a dangling
/// index entry that already points at nothing).
fn delete_edge_inner(
    kv: &Kv,
    branch: &str,
    id: &str,
    tolerate_missing: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    cancel.check("delete_edge")?;
    let id = id.to_string();
    kv.write(|table| {
        let existing = table_get(table, &key::edge_key(branch, &id))?;
        let edge = match existing {
            Some(bytes) => decode_edge(&bytes)?,
            None if tolerate_missing => return Ok(()),
            None => return Err(GraphError::NotFound(id.clone())),
        };
        table_remove(table, &key::idx_edge_key(branch, &edge.source_id, edge.r#type, &edge.id))?;
        table_remove(table, &key::idx_redge_key(branch, &edge.target_id, edge.r#type, &edge.id))?;
        table_remove(table, &key::edge_key(branch, &edge.id))
    })
}

/// Deletes an edge by id. Fails with [`GraphError::NotFound`] if missing.
pub fn delete_edge(kv: &Kv, branch: &str, id: &str, cancel: &CancellationToken) -> Result<()> {
    delete_edge_inner(kv, branch, id, false, cancel)
}

fn edge_ids_touching(kv: &Kv, branch: &str, node_id: &str) -> Result<BTreeSet<String>> {
    let mut ids = BTreeSet::new();
    for (k, _) in kv.scan_prefix(&key::idx_edge_prefix(branch, node_id))? {
        if let Some(id) = key::decode_trailing_id(&k) {
            ids.insert(id.to_string());
        }
    }
    for (k, _) in kv.scan_prefix(&key::idx_redge_prefix(branch, node_id))? {
        if let Some(id) = key::decode_trailing_id(&k) {
            ids.insert(id.to_string());
        }
    }
    Ok(ids)
}

/// Deletes a node, then cascades to every edge touching it.
///
/// The node's own removal is one transaction; each cascaded edge delete is
/// its own bounded transaction rather than one all-encompassing transaction,
/// so a crash partway through leaves at most a few dangling index entries
/// rather than an inconsistent node. Fails with [`GraphError::NotFound`] if
/// the node doesn't exist.
pub fn delete_node(kv: &Kv, branch: &str, id: &str, cancel: &CancellationToken) -> Result<()> {
    cancel.check("delete_node")?;
    let node_key = key::node_key(branch, id);
    let existing = kv.get(&node_key)?.ok_or_else(|| GraphError::NotFound(id.to_string()))?;
    let node = decode_node(&existing)?;

    let touching = edge_ids_touching(kv, branch, id)?;

    kv.write(|table| {
        remove_node_indexes(table, branch, &node)?;
        table_remove(table, &node_key)
    })?;

    for edge_id in touching {
        cancel.check("delete_node:cascade")?;
        // A prior cascade step (or concurrent writer) may have already
        // removed this edge; tolerate the now-dangling index entry.
        delete_edge_inner(kv, branch, &edge_id, true, cancel)?;
    }
    Ok(())
}

/// Deletes every node whose `filePath` equals `file_path`, cascading edges
/// for each. Returns the number of nodes deleted.
pub fn delete_by_file(
    kv: &Kv,
    branch: &str,
    file_path: &str,
    cancel: &CancellationToken,
) -> Result<u64> {
    cancel.check("delete_by_file")?;
    let ids: Vec<String> = kv
        .scan_prefix(&key::idx_file_prefix(branch, file_path))?
        .into_iter()
        .filter_map(|(k, _)| key::decode_trailing_id(&k).map(str::to_string))
        .collect();

    let mut count = 0u64;
    for id in ids {
        cancel.check("delete_by_file:cascade")?;
        match delete_node(kv, branch, &id, cancel) {
            Ok(()) => count += 1,
            Err(GraphError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(count)
}

/// Applies a batch of node id/path rewrites within a single write
/// transaction. Used by path migration, which chooses how many rewrites go
/// into each transaction (the whole branch, or a configured chunk size).
pub(crate) fn apply_node_rewrites(
    kv: &Kv,
    branch: &str,
    rewrites: &[(String, Node)],
    cancel: &CancellationToken,
) -> Result<()> {
    cancel.check("apply_node_rewrites")?;
    kv.write(|table| {
        for (old_id, new_node) in rewrites {
            if let Some(old_bytes) = table_get(table, &key::node_key(branch, old_id))? {
                let old = decode_node(&old_bytes)?;
                remove_node_indexes(table, branch, &old)?;
                table_remove(table, &key::node_key(branch, old_id))?;
            }
            insert_node_indexes(table, branch, new_node)?;
            let bytes = encode_node(new_node)?;
            table_insert(table, &key::node_key(branch, &new_node.id), &bytes)?;
        }
        Ok(())
    })
}

/// Applies a batch of edge id/endpoint rewrites within a single write
/// transaction.
pub(crate) fn apply_edge_rewrites(
    kv: &Kv,
    branch: &str,
    rewrites: &[(String, Edge)],
    cancel: &CancellationToken,
) -> Result<()> {
    cancel.check("apply_edge_rewrites")?;
    kv.write(|table| {
        for (old_id, new_edge) in rewrites {
            if let Some(old_bytes) = table_get(table, &key::edge_key(branch, old_id))? {
                let old = decode_edge(&old_bytes)?;
                table_remove(table, &key::idx_edge_key(branch, &old.source_id, old.r#type, &old.id))?;
                table_remove(table, &key::idx_redge_key(branch, &old.target_id, old.r#type, &old.id))?;
                table_remove(table, &key::edge_key(branch, old_id))?;
            }
            table_insert(
                table,
                &key::idx_edge_key(branch, &new_edge.source_id, new_edge.r#type, &new_edge.id),
                b"",
            )?;
            table_insert(
                table,
                &key::idx_redge_key(branch, &new_edge.target_id, new_edge.r#type, &new_edge.id),
                b"",
            )?;
            let bytes = encode_edge(new_edge)?;
            table_insert(table, &key::edge_key(branch, &new_edge.id), &bytes)?;
        }
        Ok(())
    })
}
