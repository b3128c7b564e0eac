// In crates/signals/src/inbox.rs

use crate::{Error, Result, SignalSource};
use async_trait::async_trait;
use core_types::TradeSignal;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

/// A JSON-lines file that other processes append signals to.
///
/// The inbox remembers the byte offset it has consumed up to, so each line is
/// delivered once. The offset is kept in a `<inbox>.offset` sidecar file and
/// saved before a pull returns, so a restarted process resumes where the last
/// one stopped. A trailing line without a newline is left for the next pull.
/// If the file shrinks below the offset it is assumed to have been rotated and
/// is read again from the start.
#[derive(Debug)]
pub struct JsonlInbox {
    path: PathBuf,
    offset_path: PathBuf,
    // `None` until the sidecar has been read.
    offset: Mutex<Option<u64>>,
}

impl JsonlInbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut offset_path = path.clone().into_os_string();
        offset_path.push(".offset");
        Self {
            path,
            offset_path: offset_path.into(),
            offset: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset_path(&self) -> &Path {
        &self.offset_path
    }

    async fn load_offset(&self) -> Result<u64> {
        match tokio::fs::read_to_string(&self.offset_path).await {
            Ok(text) => match text.trim().parse::<u64>() {
                Ok(offset) => Ok(offset),
                Err(_) => {
                    tracing::warn!(path = %self.offset_path.display(), "Unreadable inbox offset; starting from the beginning.");
                    Ok(0)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the offset to a temp file and renames it over the sidecar.
    async fn store_offset(&self, offset: u64) -> Result<()> {
        let mut tmp = self.offset_path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, offset.to_string()).await?;
        tokio::fs::rename(&tmp, &self.offset_path).await?;
        Ok(())
    }

    /// Appends `signal` as one line. Used by `atlas submit-signal`.
    pub async fn submit(&self, signal: &TradeSignal) -> Result<()> {
        if !signal.is_well_formed() {
            return Err(Error::NotWellFormed(signal.symbol.to_string()));
        }
        let mut line = serde_json::to_string(signal)?;
        line.push('\n');
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

    fn parse_line(&self, line: &str) -> Option<TradeSignal> {
        match serde_json::from_str::<TradeSignal>(line) {
            Ok(signal) if signal.is_well_formed() => Some(signal),
            Ok(signal) => {
                tracing::warn!(symbol = %signal.symbol, "Dropping signal with empty symbol or non-positive entry.");
                None
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Dropping malformed inbox line.");
                None
            }
        }
    }
}

#[async_trait]
impl SignalSource for JsonlInbox {
    fn name(&self) -> &'static str {
        "JsonlInbox"
    }

    async fn pull(&self) -> Result<Vec<TradeSignal>> {
        let mut guard = self.offset.lock().await;
        let mut offset = match *guard {
            Some(offset) => offset,
            None => self.load_offset().await?,
        };
        *guard = Some(offset);

        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata().await?.len();
        if len < offset {
            tracing::warn!(path = %self.path.display(), "Inbox shrank; reading from the start.");
            offset = 0;
        }
        file.seek(SeekFrom::Start(offset)).await?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;

        // Only consume up to the last complete line.
        let Some(end) = buf.iter().rposition(|&b| b == b'\n') else {
            if *guard != Some(offset) {
                self.store_offset(offset).await?;
                *guard = Some(offset);
            }
            return Ok(Vec::new());
        };
        let complete = &buf[..=end];
        offset += complete.len() as u64;
        // Saved before anything is handed out, so a crash never replays a line.
        self.store_offset(offset).await?;
        *guard = Some(offset);

        Ok(String::from_utf8_lossy(complete)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| self.parse_line(line))
            .collect())
    }
}
