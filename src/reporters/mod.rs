//! Output reporters for repoviz
//!
//! The document is rendered as pretty-printed JSON (`json`) and written
//! atomically: a sibling temp file is written first and renamed over the
//! destination, so readers never see a partial file.

pub mod json;

use crate::models::RepositoryData;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Render `data` and write it to `path` atomically.
pub fn write_report(data: &RepositoryData, path: &Path) -> Result<()> {
    let rendered = json::render(data)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "repo_data.json".to_string());
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    fs::write(&tmp_path, rendered)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e).with_context(|| format!("Failed to move output into {}", path.display()));
    }
    Ok(())
}
