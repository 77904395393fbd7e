//! Core data types for the code knowledge graph.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// Reserved `properties` key marking the branch a node/edge was read from.
/// Never persisted (invariant 5); attached only on read.
pub const GRAPH_SOURCE_KEY: &str = "graphSource";

/// Reserved `properties` key naming a node's architectural role.
pub const ARCH_ROLE_KEY: &str = "archRole";

/// Type of node in the knowledge graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeType {
    File,
    TestFile,
    Module,
    Package,
    Class,
    Struct,
    Interface,
    Enum,
    Function,
    Method,
    TestFunction,
    Constant,
    Variable,
    TypeAlias,
    Dependency,
    APIEndpoint,
    Document,
    DBModel,
}

impl NodeType {
    const ALL: &'static [NodeType] = &[
        NodeType::File,
        NodeType::TestFile,
        NodeType::Module,
        NodeType::Package,
        NodeType::Class,
        NodeType::Struct,
        NodeType::Interface,
        NodeType::Enum,
        NodeType::Function,
        NodeType::Method,
        NodeType::TestFunction,
        NodeType::Constant,
        NodeType::Variable,
        NodeType::TypeAlias,
        NodeType::Dependency,
        NodeType::APIEndpoint,
        NodeType::Document,
        NodeType::DBModel,
    ];

    /// All variants, in declaration order. Used to build `GraphStats` tables
    /// with a stable, complete key set.
    pub fn all() -> &'static [NodeType] {
        Self::ALL
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for NodeType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|k| k.to_string() == s)
            .copied()
            .ok_or_else(|| GraphError::InvalidInput(format!("unknown node type: {s}")))
    }
}

/// Type of edge relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeType {
    Contains,
    Calls,
    Imports,
    Implements,
    Exposes,
    DependsOn,
}

impl EdgeType {
    const ALL: &'static [EdgeType] = &[
        EdgeType::Contains,
        EdgeType::Calls,
        EdgeType::Imports,
        EdgeType::Implements,
        EdgeType::Exposes,
        EdgeType::DependsOn,
    ];

    /// All variants, in declaration order.
    pub fn all() -> &'static [EdgeType] {
        Self::ALL
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for EdgeType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|k| k.to_string() == s)
            .copied()
            .ok_or_else(|| GraphError::InvalidInput(format!("unknown edge type: {s}")))
    }
}

/// A code entity: file, module, class, function, dependency, and so on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable identifier, typically a hash of `type || filePath || name`.
    pub id: String,
    pub r#type: NodeType,
    pub name: String,
    #[serde(default)]
    pub qualified_name: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub end_line: u32,
    #[serde(default)]
    pub exported: bool,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub doc_comment: String,
    /// String-valued properties. Reserved keys: [`ARCH_ROLE_KEY`], [`GRAPH_SOURCE_KEY`].
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Numeric metrics; values must be finite.
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl Node {
    /// The `archRole` property, if set.
    pub fn arch_role(&self) -> Option<&str> {
        self.properties.get(ARCH_ROLE_KEY).map(String::as_str)
    }

    /// The `graphSource` property, if attached by a read.
    pub fn graph_source(&self) -> Option<&str> {
        self.properties.get(GRAPH_SOURCE_KEY).map(String::as_str)
    }

    /// Returns a copy with `graphSource` set, used when tagging a node read
    /// from a particular branch.
    pub(crate) fn with_graph_source(mut self, branch: &str) -> Self {
        self.properties
            .insert(GRAPH_SOURCE_KEY.to_string(), branch.to_string());
        self
    }

    /// Returns a copy with `graphSource` removed, used before persisting or exporting.
    pub(crate) fn without_graph_source(mut self) -> Self {
        self.properties.remove(GRAPH_SOURCE_KEY);
        self
    }
}

/// A typed directed relation between two node ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Stable identifier, conventionally `sourceId + "-" + type + "-" + targetId`.
    pub id: String,
    pub r#type: EdgeType,
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Edge {
    /// The `graphSource` property, if attached by a read.
    pub fn graph_source(&self) -> Option<&str> {
        self.properties.get(GRAPH_SOURCE_KEY).map(String::as_str)
    }

    pub(crate) fn with_graph_source(mut self, branch: &str) -> Self {
        self.properties
            .insert(GRAPH_SOURCE_KEY.to_string(), branch.to_string());
        self
    }

    pub(crate) fn without_graph_source(mut self) -> Self {
        self.properties.remove(GRAPH_SOURCE_KEY);
        self
    }
}

/// Direction of traversal for `GetNeighbors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// Filter options accepted by `QueryNodes`.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub r#type: Option<NodeType>,
    pub file_path: Option<String>,
    pub package: Option<String>,
    pub language: Option<String>,
    pub name_pattern: Option<String>,
    pub exported: Option<bool>,
    pub properties: BTreeMap<String, String>,
}

impl NodeFilter {
    /// A filter that matches every node (selectivity policy falls back to a full scan).
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, t: NodeType) -> Self {
        self.r#type = Some(t);
        self
    }

    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_package(mut self, pkg: impl Into<String>) -> Self {
        self.package = Some(pkg.into());
        self
    }

    pub fn with_language(mut self, lang: impl Into<String>) -> Self {
        self.language = Some(lang.into());
        self
    }

    pub fn with_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = Some(pattern.into());
        self
    }

    pub fn with_exported(mut self, exported: bool) -> Self {
        self.exported = Some(exported);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Aggregate counts over a graph (or a merged view of several branches).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphStats {
    pub total_nodes: u64,
    pub total_edges: u64,
    pub nodes_by_type: BTreeMap<NodeType, u64>,
    pub edges_by_type: BTreeMap<EdgeType, u64>,
}

impl GraphStats {
    /// Adds `other`'s counts into `self` in place, without deduplicating ids
    /// (used by the layered store, whose stats are additive by design).
    pub(crate) fn add_assign(&mut self, other: &GraphStats) {
        self.total_nodes += other.total_nodes;
        self.total_edges += other.total_edges;
        for (k, v) in &other.nodes_by_type {
            *self.nodes_by_type.entry(*k).or_default() += v;
        }
        for (k, v) in &other.edges_by_type {
            *self.edges_by_type.entry(*k).or_default() += v;
        }
    }
}
