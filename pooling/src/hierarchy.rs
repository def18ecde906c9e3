//! Two-stage hierarchical pooling: libraries → sub-pools → master pool.
//!
//! The workflow is a short fixed sequence: partition the libraries into
//! sub-groups, allocate within each sub-group, synthesize a sub-pool
//! record per sub-group, then run the exact same allocator once more
//! over the sub-pools. Reusing the allocator unmodified is what keeps
//! read-weight proportionality transitive into the master pool: within
//! a sub-pool each library's molar contribution is proportional to its
//! weight, and across sub-pools each sub-pool's contribution is
//! proportional to its summed weight.

use crate::allocate::{allocate, Allocation};
use anyhow::Result;
use itertools::Itertools;
use pool_types::{
    Flag, HierarchicalPlan, HierarchyParams, NormalizedLibrary, PoolError, Poolable, PoolingConfig,
    PoolingParams, PoolingStage, StageEntry, StageLabel, SubPoolRecord,
};

/// One sub-group of libraries destined for the same sub-pool.
#[derive(Clone, PartialEq, Debug)]
pub struct SubGroup {
    pub subpool_id: String,
    pub members: Vec<NormalizedLibrary>,
}

/// Partition libraries by the grouping key, splitting any group larger
/// than `max_per_group` into consecutively numbered sub-groups in input
/// order.
///
/// A group that fits in one sub-pool is named `{key}_pool`; a split
/// group produces `{key}_pool_1`, `{key}_pool_2`, … (1-indexed).
pub fn group_libraries(
    libraries: &[NormalizedLibrary],
    params: &HierarchyParams,
) -> Result<Vec<SubGroup>, PoolError> {
    let mut groups: Vec<(String, Vec<NormalizedLibrary>)> = Vec::new();
    for library in libraries {
        let key = params.grouping_key.extract(&library.record);
        match groups.iter_mut().find(|(k, _)| k == key) {
            Some((_, members)) => members.push(library.clone()),
            None => groups.push((key.to_string(), vec![library.clone()])),
        }
    }
    if groups.is_empty() {
        return Err(PoolError::NoViableGrouping {
            key: params.grouping_key.to_string(),
        });
    }

    let mut subgroups = Vec::new();
    for (key, members) in groups {
        if members.len() <= params.max_per_group {
            subgroups.push(SubGroup {
                subpool_id: format!("{key}_pool"),
                members,
            });
        } else {
            for (i, chunk) in members
                .into_iter()
                .chunks(params.max_per_group)
                .into_iter()
                .enumerate()
            {
                subgroups.push(SubGroup {
                    subpool_id: format!("{key}_pool_{}", i + 1),
                    members: chunk.collect(),
                });
            }
        }
    }
    Ok(subgroups)
}

/// Synthesize the sub-pool produced by drawing the allocated volumes
/// from a sub-group's members.
///
/// The sub-pool concentration is the volume-weighted average of the
/// member concentrations, so the molar content drawn from the members
/// is exactly the molar content of the sub-pool.
fn synthesize_subpool(subgroup: &SubGroup, allocations: &[Allocation]) -> SubPoolRecord {
    let total_volume_ul: f64 = allocations.iter().map(|a| a.final_volume_ul).sum();
    let total_nanomoles: f64 = allocations
        .iter()
        .zip(&subgroup.members)
        .map(|(alloc, member)| alloc.final_volume_ul * member.effective_nm)
        .sum();
    let calculated_nm = if total_volume_ul > 0.0 {
        total_nanomoles / total_volume_ul
    } else {
        0.0
    };
    // Members share a project when grouped by project; anything mixed
    // leaves the sub-pool without one.
    let project_id = match subgroup.members.split_first() {
        Some((first, rest))
            if rest
                .iter()
                .all(|m| m.record.project_id == first.record.project_id) =>
        {
            Some(first.record.project_id.clone())
        }
        _ => None,
    };
    SubPoolRecord {
        subpool_id: subgroup.subpool_id.clone(),
        member_libraries: subgroup
            .members
            .iter()
            .map(|m| m.record.library_name.clone())
            .collect(),
        project_id,
        calculated_nm,
        total_volume_ul,
        target_weight: subgroup.members.iter().map(|m| m.record.target_weight).sum(),
    }
}

fn stage_entry<P: Poolable>(entity: &P, alloc: Allocation, subpool_id: Option<String>) -> StageEntry {
    StageEntry {
        name: alloc.name,
        subpool_id,
        effective_nm: entity.effective_nm(),
        target_weight: entity.target_weight(),
        stock_volume_ul: alloc.stock_volume_ul,
        predilute_factor: alloc.predilute_factor,
        final_volume_ul: alloc.final_volume_ul,
        pool_fraction: alloc.pool_fraction,
        expected_reads_m: alloc.expected_reads_m,
        flags: alloc.flags,
    }
}

/// Run the full two-stage workflow over an already-normalized library
/// set.
///
/// Stage 1 allocates independently within each sub-group (entities in
/// different sub-groups never interact) and never reports expected
/// reads: the run total is only meaningful against the master pool.
/// Stage 2 treats the sub-pool records as a fresh entity set and runs
/// the same allocator with `stage2_params`.
pub fn compose(
    libraries: &[NormalizedLibrary],
    hierarchy: &HierarchyParams,
    stage1_params: &PoolingParams,
    stage2_params: &PoolingParams,
    config: &PoolingConfig,
) -> Result<HierarchicalPlan> {
    hierarchy.validate()?;
    stage1_params.validate()?;
    stage2_params.validate()?;
    config.validate()?;

    let subgroups = group_libraries(libraries, hierarchy)?;
    log::info!(
        "hierarchical pooling: {} libraries into {} sub-pools by {}",
        libraries.len(),
        subgroups.len(),
        hierarchy.grouping_key
    );

    let stage1_subgroup_params = PoolingParams {
        total_reads_m: None,
        ..stage1_params.clone()
    };
    let mut stage1_entries = Vec::with_capacity(libraries.len());
    let mut subpools = Vec::with_capacity(subgroups.len());
    for subgroup in &subgroups {
        let allocations = allocate(&subgroup.members, &stage1_subgroup_params, config)?;
        subpools.push(synthesize_subpool(subgroup, &allocations));
        stage1_entries.extend(
            subgroup
                .members
                .iter()
                .zip(allocations)
                .map(|(member, alloc)| {
                    stage_entry(member, alloc, Some(subgroup.subpool_id.clone()))
                }),
        );
    }

    let stage2_allocations = allocate(&subpools, stage2_params, config)?;
    let stage2_entries: Vec<StageEntry> = subpools
        .iter()
        .zip(stage2_allocations)
        .map(|(subpool, mut alloc)| {
            if subpool.member_libraries.len() == 1 {
                alloc.flags.push(Flag::TrivialSubpool);
            }
            stage_entry(subpool, alloc, None)
        })
        .collect();

    let stage1 = PoolingStage {
        label: StageLabel::LibraryToSubpool,
        stage_number: 1,
        input_count: libraries.len(),
        output_count: subpools.len(),
        pipetting_steps: libraries.len(),
        entries: stage1_entries,
    };
    let stage2 = PoolingStage {
        label: StageLabel::SubpoolToMaster,
        stage_number: 2,
        input_count: subpools.len(),
        output_count: 1,
        pipetting_steps: subpools.len(),
        entries: stage2_entries,
    };
    let total_pipetting_steps = stage1.pipetting_steps + stage2.pipetting_steps;
    Ok(HierarchicalPlan {
        stages: vec![stage1, stage2],
        total_libraries: libraries.len(),
        total_subpools: subpools.len(),
        subpools,
        grouping_key: hierarchy.grouping_key,
        total_pipetting_steps,
    })
}
