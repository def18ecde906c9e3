//! Weighted volume allocation and constraint flagging.

use pool_types::{Flag, PoolError, Poolable, PoolingConfig, PoolingParams};
use serde::{Deserialize, Serialize};

/// The volumes and derived metrics computed for one poolable entity.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Allocation {
    pub name: String,
    /// Volume from the proportional formula, before dilution (µl).
    pub stock_volume_ul: f64,
    /// Source dilution recorded for the bench: the sample is diluted by
    /// this factor before `final_volume_ul` is drawn.
    pub predilute_factor: f64,
    pub final_volume_ul: f64,
    /// Share of the pool's total molecular content (0-1).
    pub pool_fraction: f64,
    pub expected_reads_m: Option<f64>,
    pub flags: Vec<Flag>,
}

/// Compute the volume to draw from each entity so that molecular
/// contribution is proportional to target weight.
///
/// Per entity: `stock = scaling_factor / effective_nm * target_weight`.
/// The result is deliberately not rescaled to hit a fixed total pool
/// volume; the total is emergent from the scaling factor and the
/// per-entity weights and concentrations. Stock volumes too small to
/// pipette are scaled up by a recorded pre-dilution factor so the
/// delivered volume is accurate.
pub fn allocate<P: Poolable>(
    entities: &[P],
    params: &PoolingParams,
    config: &PoolingConfig,
) -> Result<Vec<Allocation>, PoolError> {
    let mut allocations = Vec::with_capacity(entities.len());
    for entity in entities {
        let nm = entity.effective_nm();
        if nm <= 0.0 || !nm.is_finite() {
            // Normalization filters these; reaching here is a caller bug.
            return Err(PoolError::InvalidConcentration {
                name: entity.name().to_string(),
                nm,
            });
        }
        let stock_volume_ul = params.scaling_factor / nm * entity.target_weight();
        let predilute_factor = config.predilute_factor(stock_volume_ul);
        let final_volume_ul = stock_volume_ul * predilute_factor;
        allocations.push(Allocation {
            name: entity.name().to_string(),
            stock_volume_ul,
            predilute_factor,
            final_volume_ul,
            pool_fraction: 0.0,
            expected_reads_m: None,
            flags: Vec::new(),
        });
    }

    // Cross-entity metrics need every final volume known first.
    let total_molar: f64 = allocations
        .iter()
        .zip(entities)
        .map(|(alloc, entity)| alloc.final_volume_ul * entity.effective_nm())
        .sum();
    for (alloc, entity) in allocations.iter_mut().zip(entities) {
        if total_molar > 0.0 {
            alloc.pool_fraction = alloc.final_volume_ul * entity.effective_nm() / total_molar;
        }
        alloc.expected_reads_m = params.total_reads_m.map(|total| total * alloc.pool_fraction);
        alloc.flags = flag_volumes(entity, alloc.final_volume_ul, params);
    }
    Ok(allocations)
}

/// Compare a computed final volume against the entity's volume on hand
/// and the pipetting bounds. Flags are informational only; nothing here
/// fails the allocation.
pub fn flag_volumes<P: Poolable>(
    entity: &P,
    final_volume_ul: f64,
    params: &PoolingParams,
) -> Vec<Flag> {
    let mut flags = Vec::new();
    if final_volume_ul > entity.available_volume_ul() {
        flags.push(Flag::InsufficientSampleVolume);
    }
    // Checked post-dilution: if pre-dilution already lifted the volume
    // into pipettable range, there is nothing to warn about.
    if final_volume_ul < params.min_pipette_volume_ul {
        flags.push(Flag::BelowMinimumPipetteVolume);
    }
    if let Some(max) = params.max_volume_ul {
        if final_volume_ul > max {
            flags.push(Flag::ExceedsMaximumVolume);
        }
    }
    flags
}
