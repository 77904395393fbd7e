//! `codeeagle_graph`: a branch-namespaced code knowledge graph storage
//! engine built on an embedded key-value store.
//!
//! Nodes are code entities (files, classes, functions, dependencies, ...)
//! and edges are typed relations between them (`Contains`, `Calls`,
//! `Imports`, ...). The store keeps every value under a branch namespace;
//! callers open a [`GraphStore`] naming which branch to write and which
//! branches to read, with earlier branches in the read list taking
//! precedence over later ones for any id they both define.
//!
//! ```
//! use codeeagle_graph::{CancellationToken, GraphStore, Node, NodeType};
//! use std::collections::BTreeMap;
//!
//! # fn main() -> codeeagle_graph::Result<()> {
//! let dir = tempfile::TempDir::new().unwrap();
//! let store = GraphStore::open(dir.path().join("graph.redb"), "main", vec!["main".to_string()])?;
//! let cancel = CancellationToken::none();
//!
//! store.add_node(
//!     &Node {
//!         id: "n1".to_string(),
//!         r#type: NodeType::Function,
//!         name: "main".to_string(),
//!         qualified_name: String::new(),
//!         file_path: "src/main.rs".to_string(),
//!         package: String::new(),
//!         language: "rust".to_string(),
//!         line: 1,
//!         end_line: 3,
//!         exported: true,
//!         signature: String::new(),
//!         doc_comment: String::new(),
//!         properties: BTreeMap::new(),
//!         metrics: BTreeMap::new(),
//!     },
//!     &cancel,
//! )?;
//!
//! assert!(store.get_node("n1", &cancel)?.is_some());
//! # Ok(())
//! # }
//! ```

mod branch;
mod cancel;
mod config;
mod error;
mod exportimport;
mod id;
mod key;
mod kv;
mod layered;
mod migration;
mod query;
mod store;
mod types;

pub use branch::GraphStore;
pub use cancel::CancellationToken;
pub use config::GraphConfig;
pub use error::{GraphError, Result};
pub use exportimport::ImportOutcome;
pub use id::{compute_edge_id, compute_node_id};
pub use layered::LayeredStore;
pub use migration::MigrationReport;
pub use query::glob_match;
pub use types::{
    Direction, Edge, EdgeType, GraphStats, Node, NodeFilter, NodeType, ARCH_ROLE_KEY,
    GRAPH_SOURCE_KEY,
};
