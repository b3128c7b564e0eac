// In crates/database/src/journal.rs

use crate::{mentions, ContextSource, Result, TradeRecordSink};
use async_trait::async_trait;
use core_types::TradeRecord;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// A trade journal stored as one JSON object per line.
///
/// The journal is both a record sink and the context source the advisor
/// reads past rationale from.
#[derive(Debug)]
pub struct JsonlJournal {
    path: PathBuf,
    context_limit: usize,
    // Appends from concurrent pipelines must not interleave within a line.
    write_lock: Mutex<()>,
}

impl JsonlJournal {
    pub fn new(path: impl Into<PathBuf>, context_limit: usize) -> Self {
        Self {
            path: path.into(),
            context_limit,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every well-formed record, oldest first. A missing file is an empty journal.
    pub async fn records(&self) -> Result<Vec<TradeRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "Skipping malformed journal line.");
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl TradeRecordSink for JsonlJournal {
    fn name(&self) -> &'static str {
        "JsonlJournal"
    }

    async fn append(&self, record: &TradeRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl ContextSource for JsonlJournal {
    fn name(&self) -> &'static str {
        "JsonlJournal"
    }

    async fn search(&self, query: &str) -> Result<String> {
        let records = self.records().await?;
        let mut recent: Vec<String> = records
            .iter()
            .rev()
            .filter(|r| mentions(query, &r.symbol))
            .take(self.context_limit)
            .map(TradeRecord::rationale)
            .collect();
        recent.reverse();
        Ok(recent.join("\n"))
    }
}
