//! Per-query statistics file
//!
//! Workers push one `QueryStat` per recorded request into a bounded channel;
//! a blocking task drains it into a CSV file so file I/O never runs on the
//! async workers. A full channel makes workers wait, so every recorded
//! request ends up in the file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{EngineError, Result};

/// Pending rows buffered between workers and the writer
const CHANNEL_CAPACITY: usize = 4_096;

/// One recorded request
#[derive(Debug, Clone, Serialize)]
pub struct QueryStat {
    pub timestamp: DateTime<Utc>,
    pub group: String,
    pub method: &'static str,
    pub url: String,
    pub status: Option<u16>,
    pub latency_us: u64,
    pub error: Option<String>,
}

/// Sending half handed to workers
pub type StatSender = mpsc::Sender<QueryStat>;

/// Background CSV writer for `QueryStat` rows
pub struct StatWriter {
    path: PathBuf,
    handle: JoinHandle<Result<u64>>,
}

impl StatWriter {
    /// Create the stat file and start the writer task.
    ///
    /// The file is created before any request is sent, so an unwritable path
    /// fails the run up front.
    pub fn spawn(path: impl AsRef<Path>) -> Result<(Self, StatSender)> {
        let path = path.as_ref().to_path_buf();
        let mut writer = csv::Writer::from_path(&path).map_err(|source| EngineError::StatFile {
            path: path.display().to_string(),
            source,
        })?;

        let (tx, mut rx) = mpsc::channel::<QueryStat>(CHANNEL_CAPACITY);
        let file = path.display().to_string();

        let handle = tokio::task::spawn_blocking(move || {
            let mut rows = 0u64;
            while let Some(stat) = rx.blocking_recv() {
                writer
                    .serialize(&stat)
                    .map_err(|source| EngineError::StatFile {
                        path: file.clone(),
                        source,
                    })?;
                rows += 1;
            }
            writer.flush().map_err(|e| EngineError::StatFile {
                path: file.clone(),
                source: e.into(),
            })?;
            Ok(rows)
        });

        Ok((Self { path, handle }, tx))
    }

    /// Wait for every sender to drop and the file to be flushed.
    ///
    /// Returns the number of rows written.
    pub async fn finish(self) -> Result<u64> {
        let rows = self.handle.await??;
        debug!("Wrote {} query stats to {}", rows, self.path.display());
        Ok(rows)
    }
}

/// Forward a stat, waiting while the writer lags behind
pub(crate) async fn send_stat(tx: &StatSender, stat: QueryStat) {
    if tx.send(stat).await.is_err() {
        // writer task ended early; finish() reports its error
        debug!("Query stat writer closed");
    }
}
