//! Ambient on-disk configuration for engine tuning knobs.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

const DEFAULT_DELETE_BATCH_SIZE: usize = 1000;
const DEFAULT_IMPORT_LINE_BUFFER_LIMIT: usize = 10 * 1024 * 1024;

/// Tuning knobs for the storage engine, loaded from an optional
/// `config.toml` beside the store directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Batch size used by `DeleteByBranch`'s bounded-transaction sweep.
    pub delete_batch_size: usize,
    /// When set, `MigrateAbsToRelPaths` chunks its rewrite passes into
    /// sub-transactions of this size instead of one transaction per branch.
    pub migration_batch_size: Option<usize>,
    /// Maximum single NDJSON line size the importer will buffer before
    /// failing with `InvalidInput`.
    pub import_line_buffer_limit: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            delete_batch_size: DEFAULT_DELETE_BATCH_SIZE,
            migration_batch_size: None,
            import_line_buffer_limit: DEFAULT_IMPORT_LINE_BUFFER_LIMIT,
        }
    }
}

impl GraphConfig {
    /// Loads configuration from `path`, returning the default configuration
    /// if the file doesn't exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .map_err(|e| GraphError::Backend(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&text)
            .map_err(|e| GraphError::InvalidInput(format!("parsing {}: {e}", path.display())))
    }

    /// Saves configuration to `path` as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = toml::to_string_pretty(self)
            .map_err(|e| GraphError::Serialization(e.to_string()))?;
        fs::write(path, text)
            .map_err(|e| GraphError::Backend(format!("writing {}: {e}", path.display())))
    }
}
