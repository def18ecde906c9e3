//! Single-stage vs. hierarchical strategy recommendation.

use pool_types::params::{DEFAULT_MAX_PER_POOL, DEFAULT_MIN_GROUPS_FOR_HIERARCHICAL};
use pool_types::{GroupingKey, LibraryRecord, PoolError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum_macros::{Display, EnumString};

#[derive(
    Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Strategy {
    SingleStage,
    Hierarchical,
}

/// How one candidate grouping key partitions the library set.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct KeyAnalysis {
    pub key: GroupingKey,
    pub group_count: usize,
    pub viable: bool,
}

/// A strategy recommendation with enough structured rationale for the
/// caller to display it.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct StrategyRecommendation {
    pub strategy: Strategy,
    /// Grouping keys that partition the set into enough sub-pools.
    pub viable_keys: Vec<GroupingKey>,
    /// Per-candidate-key group counts, viable or not.
    pub keys: Vec<KeyAnalysis>,
    pub total_libraries: usize,
    pub max_per_pool: usize,
    pub reason: String,
    /// Set when a hierarchical run will need manual grouping.
    pub warning: Option<String>,
}

/// Recommend a pooling strategy for a library set.
///
/// At or below `max_per_pool` libraries a single flat pool is fine.
/// Above it, a hierarchical run is recommended; any candidate grouping
/// key producing at least `min_groups_for_hierarchical` groups is
/// listed as viable, and if none qualifies the caller is warned that
/// sub-pools must be assigned manually. Pure; does not mutate input.
pub fn select(
    records: &[LibraryRecord],
    max_per_pool: usize,
    min_groups_for_hierarchical: usize,
) -> Result<StrategyRecommendation, PoolError> {
    if records.is_empty() {
        return Err(PoolError::EmptyEntitySet);
    }
    let total = records.len();

    let keys: Vec<KeyAnalysis> = GroupingKey::candidates()
        .iter()
        .map(|&key| {
            let group_count = records
                .iter()
                .map(|r| key.extract(r))
                .collect::<HashSet<_>>()
                .len();
            KeyAnalysis {
                key,
                group_count,
                viable: group_count >= min_groups_for_hierarchical,
            }
        })
        .collect();

    // Inclusive bound: a set that exactly fills one plate stays flat.
    if total <= max_per_pool {
        return Ok(StrategyRecommendation {
            strategy: Strategy::SingleStage,
            viable_keys: Vec::new(),
            keys,
            total_libraries: total,
            max_per_pool,
            reason: format!("{total} libraries fit in a single pool of {max_per_pool}"),
            warning: None,
        });
    }

    let viable_keys: Vec<GroupingKey> =
        keys.iter().filter(|k| k.viable).map(|k| k.key).collect();
    let warning = if viable_keys.is_empty() {
        Some(format!(
            "no grouping key yields {min_groups_for_hierarchical}+ sub-pools; \
             sub-pools must be assigned manually"
        ))
    } else {
        None
    };
    Ok(StrategyRecommendation {
        strategy: Strategy::Hierarchical,
        viable_keys,
        keys,
        total_libraries: total,
        max_per_pool,
        reason: format!(
            "{total} libraries exceed the single-pool limit of {max_per_pool}"
        ),
        warning,
    })
}

/// [`select`] with the deployment defaults (96-well plate, 5 sub-pools).
pub fn select_default(records: &[LibraryRecord]) -> Result<StrategyRecommendation, PoolError> {
    select(
        records,
        DEFAULT_MAX_PER_POOL,
        DEFAULT_MIN_GROUPS_FOR_HIERARCHICAL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn libraries(count: usize, projects: usize) -> Vec<LibraryRecord> {
        (0..count)
            .map(|i| LibraryRecord {
                project_id: format!("P{}", i % projects),
                library_name: format!("L{i}"),
                barcode: format!("BC{i}"),
                concentration_ng_ul: 1.0,
                fragment_size_bp: 200.0,
                available_volume_ul: 30.0,
                empirical_nm: None,
                target_weight: 10.0,
            })
            .collect()
    }

    #[test]
    fn test_plate_boundary_is_inclusive() {
        let rec = select_default(&libraries(96, 6)).unwrap();
        assert_eq!(rec.strategy, Strategy::SingleStage);

        let rec = select_default(&libraries(97, 6)).unwrap();
        assert_eq!(rec.strategy, Strategy::Hierarchical);
        assert_eq!(rec.viable_keys, vec![GroupingKey::Project]);
        assert!(rec.warning.is_none());
    }

    #[test]
    fn test_too_few_groups_warns_about_manual_grouping() {
        let rec = select_default(&libraries(120, 2)).unwrap();
        assert_eq!(rec.strategy, Strategy::Hierarchical);
        assert!(rec.viable_keys.is_empty());
        assert!(rec.warning.is_some());
        assert_eq!(rec.keys[0].group_count, 2);
    }

    #[test]
    fn test_empty_set_is_a_structural_error() {
        assert_eq!(select_default(&[]).unwrap_err(), PoolError::EmptyEntitySet);
    }
}
