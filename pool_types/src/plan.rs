//! Multi-stage pooling plan records.

use crate::entity::SubPoolRecord;
use crate::flags::Flag;
use crate::params::GroupingKey;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Which pooling operation a stage represents. Stages are ordered from
/// earliest to latest in the workflow.
#[derive(
    Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StageLabel {
    LibraryToSubpool,
    SubpoolToMaster,
}

/// One allocated entity within a stage: a library in stage 1, a
/// sub-pool in stage 2.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct StageEntry {
    pub name: String,
    /// Destination sub-pool in stage 1; None in stage 2, where the
    /// destination is the single master pool.
    pub subpool_id: Option<String>,
    pub effective_nm: f64,
    pub target_weight: f64,
    pub stock_volume_ul: f64,
    pub predilute_factor: f64,
    pub final_volume_ul: f64,
    /// Fraction of the destination pool's molecular content.
    pub pool_fraction: f64,
    pub expected_reads_m: Option<f64>,
    pub flags: Vec<Flag>,
}

/// One pass of the allocator: input set, output set, diagnostics.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct PoolingStage {
    pub label: StageLabel,
    /// Sequential, starting at 1.
    pub stage_number: usize,
    pub input_count: usize,
    pub output_count: usize,
    pub pipetting_steps: usize,
    pub entries: Vec<StageEntry>,
}

/// The complete two-stage workflow. Immutable once computed; consumed
/// only for export and display.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct HierarchicalPlan {
    /// Stage 1 (all per-sub-group runs counted together) then stage 2.
    pub stages: Vec<PoolingStage>,
    pub subpools: Vec<SubPoolRecord>,
    pub grouping_key: GroupingKey,
    pub total_libraries: usize,
    pub total_subpools: usize,
    /// Stage-1 entity count plus stage-2 entity count.
    pub total_pipetting_steps: usize,
}

impl HierarchicalPlan {
    /// Stage numbers must be sequential starting at 1.
    pub fn stages_are_sequential(&self) -> bool {
        self.stages
            .iter()
            .enumerate()
            .all(|(i, stage)| stage.stage_number == i + 1)
    }
}
