//! Flat JSON snapshot of one run's reviews.
//!
//! The snapshot is the only state kept between runs. It is a single JSON
//! array in the same shape sources deliver, so it loads back through
//! [`FileSource`](crate::pipeline::ingest::FileSource).

use std::path::Path;

use serde::Serialize;
use tokio::fs;
use tracing::info;

use crate::error::SnapshotError;

/// Write `records` as a pretty-printed JSON array, replacing any previous snapshot.
pub async fn write_snapshot<T: Serialize>(path: &Path, records: &[T]) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json).await?;

    info!(path = %path.display(), count = records.len(), "Wrote review snapshot");
    Ok(())
}
