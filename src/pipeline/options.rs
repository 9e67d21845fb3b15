use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{common::OverwritePolicy, pairing::PairingOptions, units::JoinColumns};

/// Tunables for a full aggregation run. Every field has a default, so a JSON
/// file only needs to name what it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub columns: JoinColumns,
    pub pairing: PairingOptions,
    pub overwrite: OverwritePolicy,
    /// Persist the raw polygonization as `<admin stem>.shp` next to the admin raster.
    pub save_admin_shape: bool,
}

impl PipelineOptions {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("[pipeline::options] Failed to open config file: {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("[pipeline::options] Invalid config file: {}", path.display()))
    }
}
