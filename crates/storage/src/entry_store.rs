// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence backends for the log store
//!
//! A backend applies one insert together with its evictions atomically.

use crate::entry::{EntryId, LogEntry, OwnerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Errors from a persistence backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The backend refused the write (quota, read-only, ...)
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Append-only persistence with atomic insert + delete-by-identity
pub trait EntryStore: Send + Sync {
    /// All stored entries of an owner, oldest first
    fn load(&self, owner: &OwnerId) -> Result<Vec<LogEntry>, StoreError>;

    /// Insert an entry (if any) and evict the listed ids in one atomic step
    fn commit(&self, owner: &OwnerId, insert: Option<&LogEntry>, evict: &[EntryId]) -> Result<(), StoreError>;
}

/// In-process backend
#[derive(Debug, Default)]
pub struct MemoryEntryStore {
    owners: Mutex<HashMap<OwnerId, Vec<LogEntry>>>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries currently held for an owner
    pub fn entries(&self, owner: &OwnerId) -> Vec<LogEntry> {
        self.owners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(owner)
            .cloned()
            .unwrap_or_default()
    }
}

impl EntryStore for MemoryEntryStore {
    fn load(&self, owner: &OwnerId) -> Result<Vec<LogEntry>, StoreError> {
        Ok(self.entries(owner))
    }

    fn commit(&self, owner: &OwnerId, insert: Option<&LogEntry>, evict: &[EntryId]) -> Result<(), StoreError> {
        let mut owners = self.owners.lock().unwrap_or_else(|e| e.into_inner());
        let entries = owners.entry(owner.clone()).or_default();
        entries.retain(|e| !evict.contains(&e.id));
        if let Some(entry) = insert {
            entries.push(entry.clone());
        }
        Ok(())
    }
}

/// One committed change, written as a single JSON line
#[derive(Debug, Serialize, Deserialize)]
struct Record {
    owner: OwnerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    insert: Option<LogEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    evict: Vec<EntryId>,
}

/// Durable JSON-lines backend.
///
/// Each commit is one line, synced before returning, so an insert and its
/// evictions are never split. `load` replays the file.
pub struct JsonlEntryStore {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlEntryStore {
    /// Open or create the log at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the file so it holds only live entries
    pub fn compact(&self) -> Result<(), StoreError> {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        let live = replay(&self.path, None)?;

        let tmp = self.path.with_extension("compact");
        {
            let mut out = File::create(&tmp)?;
            for entries in live.values() {
                for entry in entries {
                    let record = Record {
                        owner: entry.owner.clone(),
                        insert: Some(entry.clone()),
                        evict: Vec::new(),
                    };
                    writeln!(out, "{}", serde_json::to_string(&record)?)?;
                }
            }
            out.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        *file = OpenOptions::new().append(true).open(&self.path)?;
        Ok(())
    }
}

impl EntryStore for JsonlEntryStore {
    fn load(&self, owner: &OwnerId) -> Result<Vec<LogEntry>, StoreError> {
        let _file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        let mut live = replay(&self.path, Some(owner))?;
        Ok(live.remove(owner).unwrap_or_default())
    }

    fn commit(&self, owner: &OwnerId, insert: Option<&LogEntry>, evict: &[EntryId]) -> Result<(), StoreError> {
        let record = Record {
            owner: owner.clone(),
            insert: insert.cloned(),
            evict: evict.to_vec(),
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.write_all(line.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }
}

/// Replay the file into live entries per owner, optionally for one owner only
fn replay(path: &Path, only: Option<&OwnerId>) -> Result<BTreeMap<OwnerId, Vec<LogEntry>>, StoreError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e.into()),
    };

    let mut live: BTreeMap<OwnerId, Vec<LogEntry>> = BTreeMap::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(&line)?;
        if only.is_some_and(|owner| owner != &record.owner) {
            continue;
        }
        let entries = live.entry(record.owner).or_default();
        entries.retain(|e| !record.evict.contains(&e.id));
        entries.extend(record.insert);
    }
    Ok(live)
}

#[cfg(test)]
#[path = "entry_store_tests.rs"]
mod tests;
