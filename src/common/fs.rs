use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// What a persistence operation does when its target already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// Refuse to touch an existing file (fatal error, nothing written).
    #[default]
    FailIfExists,
    /// Replace the existing file.
    Overwrite,
    /// Leave the existing file alone and report success.
    SkipIfExists,
}

/// Create the directory if it doesn't exist; error if a non-directory exists there.
pub(crate) fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            bail!("Path exists but is not a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
    }
    Ok(())
}

/// Check `path` against `policy` and create its parent directory.
/// Returns `false` when the caller should skip writing.
pub(crate) fn prepare_output(path: &Path, policy: OverwritePolicy) -> Result<bool> {
    if path.exists() {
        match policy {
            OverwritePolicy::FailIfExists => {
                bail!("[common::fs] Output already exists: {}", path.display())
            }
            OverwritePolicy::SkipIfExists => {
                log::info!("[common::fs] Skipping existing output {}", path.display());
                return Ok(false);
            }
            OverwritePolicy::Overwrite => {
                log::debug!("[common::fs] Overwriting {}", path.display());
            }
        }
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir_exists(parent)?;
    }
    Ok(true)
}
