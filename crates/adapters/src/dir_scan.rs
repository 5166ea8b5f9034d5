// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem change detection by periodic directory snapshots

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use sw_core::{AdapterId, Occurrence, Payload, PollAdapter, PollConfig, Poller, ProductionError};

/// Kind of change observed between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

impl ChangeKind {
    pub const ALL: [ChangeKind; 3] = [ChangeKind::Created, ChangeKind::Modified, ChangeKind::Deleted];

    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

type Snapshot = BTreeMap<PathBuf, FileStamp>;

/// Poller reporting files created, modified or deleted under a root.
///
/// Directories themselves are never reported. Patterns use `*` (any run of
/// characters, including `/`) and `?` (one character) and are matched
/// against the full path; a file is reported if any pattern matches.
pub struct DirectoryScan {
    root: PathBuf,
    category: String,
    patterns: Vec<String>,
    kinds: Vec<ChangeKind>,
    snapshot: Snapshot,
}

impl DirectoryScan {
    pub fn new(root: impl Into<PathBuf>, category: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            category: category.into(),
            patterns: vec!["*".to_string()],
            kinds: ChangeKind::ALL.to_vec(),
            snapshot: Snapshot::new(),
        }
    }

    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = ChangeKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn into_adapter(self, id: impl Into<AdapterId>, config: PollConfig) -> PollAdapter<Self> {
        PollAdapter::new(id, config, self)
    }

    fn wants(&self, kind: ChangeKind, path: &Path) -> bool {
        if !self.kinds.contains(&kind) {
            return false;
        }
        let path = path.to_string_lossy();
        self.patterns.iter().any(|p| wildcard_match(p, &path))
    }

    fn occurrence(&self, kind: ChangeKind, path: &Path) -> Occurrence {
        let now = Utc::now();
        let mut payload = Payload::new();
        payload.insert("event_type".to_string(), json!(kind.as_str()));
        payload.insert("src_path".to_string(), json!(path.display().to_string()));
        payload.insert("timestamp".to_string(), json!(now.to_rfc3339()));
        Occurrence::at(self.category.clone(), payload, now)
    }
}

#[async_trait]
impl Poller for DirectoryScan {
    async fn open(&mut self) -> Result<(), ProductionError> {
        self.snapshot = scan(&self.root).await?;
        tracing::debug!(root = %self.root.display(), files = self.snapshot.len(), "initial snapshot");
        Ok(())
    }

    async fn poll(&mut self) -> Result<Vec<Occurrence>, ProductionError> {
        let current = scan(&self.root).await?;
        let mut occurrences = Vec::new();

        for (path, stamp) in &current {
            let kind = match self.snapshot.get(path) {
                None => ChangeKind::Created,
                Some(previous) if previous != stamp => ChangeKind::Modified,
                Some(_) => continue,
            };
            if self.wants(kind, path) {
                occurrences.push(self.occurrence(kind, path));
            }
        }
        for path in self.snapshot.keys() {
            if !current.contains_key(path) && self.wants(ChangeKind::Deleted, path) {
                occurrences.push(self.occurrence(ChangeKind::Deleted, path));
            }
        }

        self.snapshot = current;
        Ok(occurrences)
    }
}

async fn scan(root: &Path) -> Result<Snapshot, ProductionError> {
    let mut snapshot = Snapshot::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            // A subdirectory removed mid-scan is simply absent
            Err(e) if dir != root && e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if metadata.is_dir() {
                pending.push(entry.path());
            } else if metadata.is_file() {
                snapshot.insert(
                    entry.path(),
                    FileStamp {
                        modified: metadata.modified().ok(),
                        len: metadata.len(),
                    },
                );
            }
        }
    }
    Ok(snapshot)
}

/// Shell-style match of `*` and `?` over the whole text
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
#[path = "dir_scan_tests.rs"]
mod tests;
