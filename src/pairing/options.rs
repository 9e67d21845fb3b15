use std::collections::BTreeSet;

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// Configuration of the greedy pairing pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingOptions {
    /// Sentinel ids (background, water) that never merge or absorb.
    pub excluded: BTreeSet<i64>,
    /// Fraction of the distinct labels to eliminate; 0.5 halves the unit count.
    pub target_fraction: f64,
}

impl Default for PairingOptions {
    fn default() -> Self {
        Self { excluded: BTreeSet::from([0]), target_fraction: 0.5 }
    }
}

impl PairingOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        ensure!((0.0..=1.0).contains(&self.target_fraction),
            "[pairing] target_fraction must be within [0, 1], got {}", self.target_fraction);
        Ok(())
    }

    /// Number of distinct labels at which pairing stops: `ceil(n * (1 - fraction))`.
    pub fn required_count(&self, distinct_labels: usize) -> usize {
        (distinct_labels as f64 * (1.0 - self.target_fraction)).ceil() as usize
    }
}

/// Outcome of a pairing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingSummary {
    /// Label count the pass aimed for.
    pub required: usize,
    pub initial_labels: usize,
    pub final_labels: usize,
    /// Number of merges performed.
    pub pairs: usize,
}

impl PairingSummary {
    /// Whether the pass reached its target.
    #[inline] pub fn reached_target(&self) -> bool { self.final_labels <= self.required }
}
