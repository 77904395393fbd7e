//! Deterministic id derivation shared between ingestion and migration.

use crate::types::{EdgeType, NodeType};

/// Derives a node id by hashing `type || filePath || name` with BLAKE3.
///
/// Shared by ordinary ingestion and `MigrateAbsToRelPaths` so that rewriting
/// a node's `filePath` to a relative form and recomputing its id always
/// lands on the same value a fresh ingest of that relative path would
/// produce.
pub fn compute_node_id(kind: NodeType, file_path: &str, name: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(kind.to_string().as_bytes());
    hasher.update(b"\0");
    hasher.update(file_path.as_bytes());
    hasher.update(b"\0");
    hasher.update(name.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Derives an edge id as `sourceId + "-" + type + "-" + targetId`.
///
/// Unlike node ids this is a plain concatenation, not a content hash: edge
/// identity is already pinned down by its endpoints and type.
pub fn compute_edge_id(source_id: &str, edge_type: EdgeType, target_id: &str) -> String {
    format!("{source_id}-{edge_type}-{target_id}")
}
