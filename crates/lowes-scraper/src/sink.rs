//! Record sinks.
//!
//! The pagination loop pushes one batch per listing page. Sinks own the
//! records from that point on.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use lowes_core::ProductRecord;
use tokio::io::AsyncWriteExt;

use crate::error::SinkError;

#[async_trait]
pub trait RecordSink: Send {
    async fn push(&mut self, records: Vec<ProductRecord>) -> Result<(), SinkError>;
}

/// Append-only JSON Lines file, one record per line.
///
/// Each batch is serialized up front and written with a single `write_all`,
/// so a partial batch never reaches the file.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    written: usize,
}

impl JsonlSink {
    /// Prepares `path` for appending, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Io`] if the parent directory cannot be created.
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| io_error(parent, source))?;
        }
        Ok(Self { path, written: 0 })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records written through this handle.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }
}

fn io_error(path: &Path, source: std::io::Error) -> SinkError {
    SinkError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl RecordSink for JsonlSink {
    async fn push(&mut self, records: Vec<ProductRecord>) -> Result<(), SinkError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut buf = Vec::with_capacity(records.len() * 512);
        for record in &records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|source| io_error(&self.path, source))?;
        file.write_all(&buf)
            .await
            .map_err(|source| io_error(&self.path, source))?;
        file.flush()
            .await
            .map_err(|source| io_error(&self.path, source))?;

        self.written += records.len();
        tracing::debug!(path = %self.path.display(), batch = records.len(), "appended records");
        Ok(())
    }
}

/// In-process sink. Clones share the same buffer, so a caller can keep one
/// handle while the loop owns another.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<ProductRecord>>>,
    batches: Arc<Mutex<usize>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record pushed so far.
    #[must_use]
    pub fn records(&self) -> Vec<ProductRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of non-empty batches received.
    #[must_use]
    pub fn batches(&self) -> usize {
        *self.batches.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn push(&mut self, records: Vec<ProductRecord>) -> Result<(), SinkError> {
        if records.is_empty() {
            return Ok(());
        }
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(records);
        *self.batches.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
