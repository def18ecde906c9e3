//! User-tunable parameters for a pooling run.

use crate::entity::LibraryRecord;
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Default scaling factor for the volume formula. Controls absolute
/// volume magnitude; typical useful range is 0.05 - 0.5.
pub const DEFAULT_SCALING_FACTOR: f64 = 0.1;

/// Default minimum pipettable volume (µl).
pub const DEFAULT_MIN_PIPETTE_VOLUME_UL: f64 = 0.2;

/// Default cap on libraries handled in one pooling operation (one
/// 96-well plate).
pub const DEFAULT_MAX_PER_POOL: usize = 96;

/// Default minimum number of sub-pools to justify a hierarchical run.
pub const DEFAULT_MIN_GROUPS_FOR_HIERARCHICAL: usize = 5;

/// Parameters for one allocation pass.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct PoolingParams {
    /// Multiplier in `stock = scaling_factor / nM * weight`. This is
    /// not a pool-size normalizer: total output volume is emergent.
    pub scaling_factor: f64,
    /// Volumes below this are not reliably pipettable (µl).
    pub min_pipette_volume_ul: f64,
    /// Optional per-step volume ceiling (µl).
    pub max_volume_ul: Option<f64>,
    /// Total sequencing reads (M); enables expected-reads reporting.
    pub total_reads_m: Option<f64>,
}

impl Default for PoolingParams {
    fn default() -> Self {
        PoolingParams {
            scaling_factor: DEFAULT_SCALING_FACTOR,
            min_pipette_volume_ul: DEFAULT_MIN_PIPETTE_VOLUME_UL,
            max_volume_ul: None,
            total_reads_m: None,
        }
    }
}

impl PoolingParams {
    /// Reject bad configuration at the boundary, before any allocation
    /// runs.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.scaling_factor > 0.0 && self.scaling_factor.is_finite(),
            "scaling factor must be > 0, got {}",
            self.scaling_factor
        );
        ensure!(
            self.min_pipette_volume_ul > 0.0,
            "minimum pipette volume must be > 0 µl, got {}",
            self.min_pipette_volume_ul
        );
        if let Some(max) = self.max_volume_ul {
            ensure!(
                max > self.min_pipette_volume_ul,
                "maximum volume ({max} µl) must exceed minimum pipette volume ({} µl)",
                self.min_pipette_volume_ul
            );
        }
        if let Some(reads) = self.total_reads_m {
            ensure!(reads > 0.0, "total reads must be > 0 M, got {reads}");
        }
        Ok(())
    }
}

/// How to pull a grouping value out of a library record.
#[derive(
    Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Display, EnumString, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GroupingKey {
    #[default]
    Project,
}

impl GroupingKey {
    pub fn extract<'a>(&self, record: &'a LibraryRecord) -> &'a str {
        match self {
            GroupingKey::Project => &record.project_id,
        }
    }

    /// All keys the strategy selector considers.
    pub fn candidates() -> &'static [GroupingKey] {
        &[GroupingKey::Project]
    }
}

/// Parameters for the two-stage hierarchical workflow.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct HierarchyParams {
    pub grouping_key: GroupingKey,
    /// Groups larger than this are split into consecutively numbered
    /// sub-groups, preserving input order.
    pub max_per_group: usize,
}

impl Default for HierarchyParams {
    fn default() -> Self {
        HierarchyParams {
            grouping_key: GroupingKey::default(),
            max_per_group: DEFAULT_MAX_PER_POOL,
        }
    }
}

impl HierarchyParams {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.max_per_group > 0,
            "max libraries per sub-pool must be > 0"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_pass_validation() {
        PoolingParams::default().validate().unwrap();
        HierarchyParams::default().validate().unwrap();
    }

    #[test]
    fn test_bad_scaling_factor_rejected() {
        let params = PoolingParams {
            scaling_factor: 0.0,
            ..PoolingParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_max_volume_must_exceed_min() {
        let params = PoolingParams {
            max_volume_ul: Some(0.1),
            ..PoolingParams::default()
        };
        assert!(params.validate().is_err());
    }
}
