// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log-file tail: lines appended to a file since the last poll

use async_trait::async_trait;
use serde_json::json;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use sw_core::{AdapterId, Occurrence, Payload, PollAdapter, PollConfig, Poller, ProductionError};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Poller that follows a growing text file.
///
/// `open` positions at the current end, so only lines written after start
/// are reported. A line without its trailing newline is held back until it
/// is complete. If the file shrinks it is read again from the beginning.
pub struct FileTail {
    path: PathBuf,
    category: String,
    level_filter: Option<String>,
    position: u64,
    /// Bytes of the unterminated last line
    partial: Vec<u8>,
}

impl FileTail {
    pub fn new(path: impl Into<PathBuf>, category: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            category: category.into(),
            level_filter: None,
            position: 0,
            partial: Vec::new(),
        }
    }

    /// Only report lines containing `level` (e.g. `"ERROR"`)
    pub fn with_level_filter(mut self, level: impl Into<String>) -> Self {
        self.level_filter = Some(level.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_adapter(self, id: impl Into<AdapterId>, config: PollConfig) -> PollAdapter<Self> {
        PollAdapter::new(id, config, self)
    }

    fn occurrence(&self, line: &str) -> Option<Occurrence> {
        if let Some(level) = &self.level_filter {
            if !line.contains(level.as_str()) {
                return None;
            }
        }

        let mut payload = Payload::new();
        payload.insert("line".to_string(), json!(line.trim()));
        payload.insert("path".to_string(), json!(self.path.display().to_string()));
        if let Some(level) = &self.level_filter {
            payload.insert("level".to_string(), json!(level));
        }
        Some(Occurrence::new(self.category.clone(), payload))
    }
}

#[async_trait]
impl Poller for FileTail {
    async fn open(&mut self) -> Result<(), ProductionError> {
        let metadata = tokio::fs::metadata(&self.path).await?;
        if !metadata.is_file() {
            return Err(ProductionError::Poll(format!(
                "{} is not a regular file",
                self.path.display()
            )));
        }
        self.position = metadata.len();
        self.partial.clear();
        tracing::debug!(path = %self.path.display(), position = self.position, "tail opened");
        Ok(())
    }

    async fn poll(&mut self) -> Result<Vec<Occurrence>, ProductionError> {
        let mut file = tokio::fs::File::open(&self.path).await?;
        let len = file.metadata().await?.len();

        if len < self.position {
            tracing::info!(path = %self.path.display(), "file truncated, rereading from start");
            self.position = 0;
            self.partial.clear();
        }
        if len == self.position {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(self.position)).await?;
        let read = file.read_to_end(&mut self.partial).await?;
        self.position += read as u64;

        let mut occurrences = Vec::new();
        while let Some(end) = self.partial.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.partial.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                continue;
            }
            occurrences.extend(self.occurrence(line));
        }
        Ok(occurrences)
    }
}

#[cfg(test)]
#[path = "file_tail_tests.rs"]
mod tests;
