//! E2E test harness for the code knowledge graph.

#![allow(dead_code)]

pub mod workspace;

pub use workspace::TestWorkspace;
