//! Byte-string key encoding for the single flat key-value table.
//!
//! Every key is `branch:<class>:<segments...>`, colon-separated, so every
//! key belonging to a branch shares one scannable prefix (`branch:`) and
//! `DeleteByBranch` can sweep it with one range delete per class. Segments
//! are not escaped: callers are expected to supply branch names, ids, and
//! paths that don't themselves contain the separator, matching the rest of
//! this codebase's assumption that these are opaque identifiers rather than
//! user-editable free text.

use crate::types::{EdgeType, NodeType};

const SEP: u8 = b':';

fn join(parts: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(parts.iter().map(|p| p.len() + 1).sum());
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push(SEP);
        }
        out.extend_from_slice(part);
    }
    out
}

/// Full-branch prefix, used by `DeleteByBranch` and branch enumeration.
pub fn branch_prefix(branch: &str) -> Vec<u8> {
    let mut p = branch.as_bytes().to_vec();
    p.push(SEP);
    p
}

pub fn node_key(branch: &str, id: &str) -> Vec<u8> {
    join(&[branch.as_bytes(), b"n", id.as_bytes()])
}

pub fn node_prefix(branch: &str) -> Vec<u8> {
    let mut p = join(&[branch.as_bytes(), b"n"]);
    p.push(SEP);
    p
}

pub fn edge_key(branch: &str, id: &str) -> Vec<u8> {
    join(&[branch.as_bytes(), b"e", id.as_bytes()])
}

pub fn edge_prefix(branch: &str) -> Vec<u8> {
    let mut p = join(&[branch.as_bytes(), b"e"]);
    p.push(SEP);
    p
}

pub fn idx_type_key(branch: &str, node_type: NodeType, id: &str) -> Vec<u8> {
    join(&[
        branch.as_bytes(),
        b"idx",
        b"type",
        node_type.to_string().as_bytes(),
        id.as_bytes(),
    ])
}

pub fn idx_type_prefix(branch: &str, node_type: NodeType) -> Vec<u8> {
    let mut p = join(&[branch.as_bytes(), b"idx", b"type", node_type.to_string().as_bytes()]);
    p.push(SEP);
    p
}

pub fn idx_file_key(branch: &str, file_path: &str, id: &str) -> Vec<u8> {
    join(&[branch.as_bytes(), b"idx", b"file", file_path.as_bytes(), id.as_bytes()])
}

pub fn idx_file_prefix(branch: &str, file_path: &str) -> Vec<u8> {
    let mut p = join(&[branch.as_bytes(), b"idx", b"file", file_path.as_bytes()]);
    p.push(SEP);
    p
}

pub fn idx_pkg_key(branch: &str, package: &str, id: &str) -> Vec<u8> {
    join(&[branch.as_bytes(), b"idx", b"pkg", package.as_bytes(), id.as_bytes()])
}

pub fn idx_pkg_prefix(branch: &str, package: &str) -> Vec<u8> {
    let mut p = join(&[branch.as_bytes(), b"idx", b"pkg", package.as_bytes()]);
    p.push(SEP);
    p
}

pub fn idx_role_key(branch: &str, role: &str, id: &str) -> Vec<u8> {
    join(&[branch.as_bytes(), b"idx", b"role", role.as_bytes(), id.as_bytes()])
}

pub fn idx_role_prefix(branch: &str, role: &str) -> Vec<u8> {
    let mut p = join(&[branch.as_bytes(), b"idx", b"role", role.as_bytes()]);
    p.push(SEP);
    p
}

/// Forward edge index: edges keyed by their source node id, then edge type.
pub fn idx_edge_key(branch: &str, source_id: &str, edge_type: EdgeType, edge_id: &str) -> Vec<u8> {
    join(&[
        branch.as_bytes(),
        b"idx",
        b"edge",
        source_id.as_bytes(),
        edge_type.to_string().as_bytes(),
        edge_id.as_bytes(),
    ])
}

/// Prefix covering every outgoing edge of `source_id`, regardless of type.
pub fn idx_edge_prefix(branch: &str, source_id: &str) -> Vec<u8> {
    let mut p = join(&[branch.as_bytes(), b"idx", b"edge", source_id.as_bytes()]);
    p.push(SEP);
    p
}

/// Prefix covering only `source_id`'s outgoing edges of `edge_type`.
pub fn idx_edge_type_prefix(branch: &str, source_id: &str, edge_type: EdgeType) -> Vec<u8> {
    let mut p = join(&[
        branch.as_bytes(),
        b"idx",
        b"edge",
        source_id.as_bytes(),
        edge_type.to_string().as_bytes(),
    ]);
    p.push(SEP);
    p
}

/// Reverse edge index: edges keyed by their target node id, then edge type.
pub fn idx_redge_key(branch: &str, target_id: &str, edge_type: EdgeType, edge_id: &str) -> Vec<u8> {
    join(&[
        branch.as_bytes(),
        b"idx",
        b"redge",
        target_id.as_bytes(),
        edge_type.to_string().as_bytes(),
        edge_id.as_bytes(),
    ])
}

/// Prefix covering every incoming edge of `target_id`, regardless of type.
pub fn idx_redge_prefix(branch: &str, target_id: &str) -> Vec<u8> {
    let mut p = join(&[branch.as_bytes(), b"idx", b"redge", target_id.as_bytes()]);
    p.push(SEP);
    p
}

/// Prefix covering only `target_id`'s incoming edges of `edge_type`.
pub fn idx_redge_type_prefix(branch: &str, target_id: &str, edge_type: EdgeType) -> Vec<u8> {
    let mut p = join(&[
        branch.as_bytes(),
        b"idx",
        b"redge",
        target_id.as_bytes(),
        edge_type.to_string().as_bytes(),
    ]);
    p.push(SEP);
    p
}

/// Splits the trailing `:<id>` segment off an index key, returning the id.
///
/// Index keys always end in the referenced node/edge id as their last
/// colon-separated segment, regardless of how many segments precede it.
pub fn decode_trailing_id(key: &[u8]) -> Option<&str> {
    let pos = key.iter().rposition(|&b| b == SEP)?;
    std::str::from_utf8(&key[pos + 1..]).ok()
}

/// Is this key prefixed by `prefix`?
pub fn has_prefix(key: &[u8], prefix: &[u8]) -> bool {
    key.starts_with(prefix)
}
