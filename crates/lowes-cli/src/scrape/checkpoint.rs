//! Per-store completion checkpoints for `scrape --resume`.
//!
//! `<output>/<store_id>.done` holds one completed category name per line.
//! Only categories that finished with [`CategoryOutcome::Completed`] are
//! recorded, so blocked or aborted categories are retried on resume.
//!
//! [`CategoryOutcome::Completed`]: lowes_scraper::CategoryOutcome::Completed

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::io::AsyncWriteExt;

pub(super) fn checkpoint_path(output_dir: &Path, store_id: &str) -> PathBuf {
    output_dir.join(format!("{store_id}.done"))
}

/// Category names already completed for `store_id`. A missing file means
/// nothing is done yet.
pub(super) async fn load_completed(
    output_dir: &Path,
    store_id: &str,
) -> anyhow::Result<HashSet<String>> {
    let path = checkpoint_path(output_dir, store_id);
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read checkpoint {}", path.display()))
        }
    };
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

pub(super) async fn mark_completed(
    output_dir: &Path,
    store_id: &str,
    category: &str,
) -> anyhow::Result<()> {
    let path = checkpoint_path(output_dir, store_id);
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
        .with_context(|| format!("failed to open checkpoint {}", path.display()))?;
    file.write_all(format!("{category}\n").as_bytes())
        .await
        .with_context(|| format!("failed to write checkpoint {}", path.display()))?;
    Ok(())
}
