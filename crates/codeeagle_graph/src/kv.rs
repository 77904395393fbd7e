//! Thin wrapper over a single `redb` table holding every key class.
//!
//! The whole engine — nodes, edges, and every secondary index, across every
//! branch — lives in one `TableDefinition<&[u8], &[u8]>`. Branch and class
//! separation is carried entirely in the key bytes (see `key.rs`); there is
//! no per-branch or per-index table to open.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};

use crate::cancel::CancellationToken;
use crate::error::{GraphError, Result};

const MAIN_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("codeeagle_graph");

/// Opens (or creates) a `redb` database file as the engine's backing store.
pub struct Kv {
    db: Database,
}

impl Kv {
    /// Opens the database at `path`, creating it (and its parent directories'
    /// file, not the directories themselves) if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path.as_ref())
            .map_err(|e| GraphError::Backend(format!("opening {}: {e}", path.as_ref().display())))?;
        // Ensure the table exists so reads against a freshly created file
        // don't need to special-case "table not yet created".
        let txn = db
            .begin_write()
            .map_err(|e| GraphError::Backend(e.to_string()))?;
        {
            txn.open_table(MAIN_TABLE)
                .map_err(|e| GraphError::Backend(e.to_string()))?;
        }
        txn.commit().map_err(|e| GraphError::Backend(e.to_string()))?;
        Ok(Self { db })
    }

    /// Reads a single value by exact key.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| GraphError::Backend(e.to_string()))?;
        let table = txn
            .open_table(MAIN_TABLE)
            .map_err(|e| GraphError::Backend(e.to_string()))?;
        let value = table
            .get(key)
            .map_err(|e| GraphError::Backend(e.to_string()))?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    /// Returns every `(key, value)` pair whose key starts with `prefix`, in
    /// key order.
    pub fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| GraphError::Backend(e.to_string()))?;
        let table = txn
            .open_table(MAIN_TABLE)
            .map_err(|e| GraphError::Backend(e.to_string()))?;
        let (start, end) = prefix_range(prefix);
        let mut out = Vec::new();
        for item in table
            .range(start.as_slice()..end.as_slice())
            .map_err(|e| GraphError::Backend(e.to_string()))?
        {
            let (k, v) = item.map_err(|e| GraphError::Backend(e.to_string()))?;
            out.push((k.value().to_vec(), v.value().to_vec()));
        }
        Ok(out)
    }

    /// Runs `f` against a single write transaction and commits on success.
    pub fn write<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut redb::Table<'_, &[u8], &[u8]>) -> Result<()>,
    {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| GraphError::Backend(e.to_string()))?;
        {
            let mut table = txn
                .open_table(MAIN_TABLE)
                .map_err(|e| GraphError::Backend(e.to_string()))?;
            f(&mut table)?;
        }
        txn.commit().map_err(|e| GraphError::Backend(e.to_string()))?;
        Ok(())
    }

    /// Returns every distinct branch name with at least one key in the
    /// store, derived from each key's leading `branch:` segment.
    pub fn distinct_branches(&self) -> Result<Vec<String>> {
        let mut branches: Vec<String> = self
            .scan_prefix(b"")?
            .into_iter()
            .filter_map(|(k, _)| {
                let pos = k.iter().position(|&b| b == b':')?;
                std::str::from_utf8(&k[..pos]).ok().map(str::to_string)
            })
            .collect();
        branches.sort();
        branches.dedup();
        Ok(branches)
    }

    /// Deletes every key matching `prefix` in batches of `batch_size`, one
    /// write transaction per batch, checking `cancel` between batches.
    ///
    /// Returns the total number of keys removed.
    pub fn delete_prefix_batched(
        &self,
        prefix: &[u8],
        batch_size: usize,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let batch_size = batch_size.max(1);
        let mut total = 0u64;
        loop {
            cancel.check("delete_prefix_batched")?;
            let keys: Vec<Vec<u8>> = self
                .scan_prefix(prefix)?
                .into_iter()
                .take(batch_size)
                .map(|(k, _)| k)
                .collect();
            if keys.is_empty() {
                break;
            }
            let n = keys.len() as u64;
            self.write(|table| {
                for key in &keys {
                    table
                        .remove(key.as_slice())
                        .map_err(|e| GraphError::Backend(e.to_string()))?;
                }
                Ok(())
            })?;
            total += n;
        }
        Ok(total)
    }
}

/// Builds an exclusive `[start, end)` byte-range covering every key with the
/// given prefix (`end` is `prefix` with its last byte incremented, carrying
/// through 0xff bytes; an all-0xff prefix has no finite upper bound and uses
/// the maximal byte string instead).
fn prefix_range(prefix: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let start = prefix.to_vec();
    let mut end = prefix.to_vec();
    while let Some(&last) = end.last() {
        if last == 0xff {
            end.pop();
        } else {
            *end.last_mut().unwrap() += 1;
            return (start, end);
        }
    }
    // prefix was empty or all 0xff: no finite exclusive upper bound short of
    // the maximal key; use a long run of 0xff as a practical ceiling.
    (start, vec![0xff; 256])
}
