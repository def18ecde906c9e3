//! Weighted-pooling computation engine for sequencing libraries.
//!
//! The pipeline is a pure, synchronous computation over an in-memory
//! table: molarity normalization, proportional volume allocation with
//! pre-dilution tiers, constraint flagging, per-project rollups, and a
//! two-stage hierarchical composition for experiments too large for a
//! single pool. Nothing here performs I/O; ingestion, validation and
//! export live in `pool_wrap`.

use anyhow::Result;
use pool_types::{
    ComputedLibrary, GroupSummary, HierarchicalPlan, HierarchyParams, LibraryRecord,
    PoolingConfig, PoolingParams,
};
use serde::Serialize;

pub mod aggregate;
pub mod allocate;
pub mod hierarchy;
pub mod molarity;
pub mod prepool;
pub mod strategy;

pub use allocate::{allocate, flag_volumes, Allocation};
pub use molarity::{normalize_libraries, ExcludedLibrary, NormalizeOutcome};
pub use strategy::{Strategy, StrategyRecommendation};

/// A flat, single-pool plan.
#[derive(Serialize, Clone, PartialEq, Debug)]
pub struct SingleStagePlan {
    pub libraries: Vec<ComputedLibrary>,
    /// Libraries excluded before allocation, with the reason attached.
    pub excluded: Vec<ExcludedLibrary>,
    pub summaries: Vec<GroupSummary>,
}

/// Compute a single-stage pooling plan over a validated library table.
///
/// Per-entity numeric problems become flags or exclusions; only
/// dataset-wide misconfiguration returns an error.
pub fn plan_single_stage(
    records: Vec<LibraryRecord>,
    params: &PoolingParams,
    config: &PoolingConfig,
) -> Result<SingleStagePlan> {
    params.validate()?;
    config.validate()?;

    let outcome = normalize_libraries(records, config);
    let allocations = allocate(&outcome.libraries, params, config)?;
    let libraries: Vec<ComputedLibrary> = outcome
        .libraries
        .into_iter()
        .zip(allocations)
        .map(|(library, alloc)| ComputedLibrary {
            library,
            stock_volume_ul: alloc.stock_volume_ul,
            predilute_factor: alloc.predilute_factor,
            final_volume_ul: alloc.final_volume_ul,
            pool_fraction: alloc.pool_fraction,
            expected_reads_m: alloc.expected_reads_m,
            flags: alloc.flags,
        })
        .collect();
    let summaries = aggregate::aggregate_by_project(&libraries);
    Ok(SingleStagePlan {
        libraries,
        excluded: outcome.excluded,
        summaries,
    })
}

/// A hierarchical plan plus the libraries excluded during
/// normalization.
#[derive(Serialize, Clone, PartialEq, Debug)]
pub struct HierarchicalOutcome {
    pub plan: HierarchicalPlan,
    pub excluded: Vec<ExcludedLibrary>,
}

/// Normalize a validated library table and run the two-stage workflow.
pub fn plan_hierarchical(
    records: Vec<LibraryRecord>,
    hierarchy: &HierarchyParams,
    stage1_params: &PoolingParams,
    stage2_params: &PoolingParams,
    config: &PoolingConfig,
) -> Result<HierarchicalOutcome> {
    let outcome = normalize_libraries(records, config);
    let plan = hierarchy::compose(
        &outcome.libraries,
        hierarchy,
        stage1_params,
        stage2_params,
        config,
    )?;
    Ok(HierarchicalOutcome {
        plan,
        excluded: outcome.excluded,
    })
}
