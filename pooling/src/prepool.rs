//! User-defined pre-pools.
//!
//! A pre-pool is a hand-picked set of libraries combined ahead of the
//! final pooling step, the bench equivalent of "Prepool 1" / "Prepool
//! 2" tubes. Each pre-pool is allocated internally, collapsed into a
//! single synthetic entity, and then pooled alongside the libraries
//! that were left standalone.

use crate::allocate::{allocate, Allocation};
use anyhow::Result;
use pool_types::{
    NormalizedLibrary, PoolEntity, PoolError, PoolingConfig, PoolingParams, SubPoolRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Desired relative picomole contribution per million target reads,
/// the convention used to price a pre-pool's concentration.
const PMOL_PER_TARGET_READ_M: f64 = 1.0 / 10.0;

/// A user-supplied pre-pool grouping.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct PrepoolDefinition {
    pub prepool_id: String,
    pub prepool_name: String,
    pub member_library_names: Vec<String>,
    pub notes: Option<String>,
}

/// One calculated pre-pool: the definition, the synthetic entity it
/// becomes, and the volumes drawn from its members.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct PrepoolResult {
    pub definition: PrepoolDefinition,
    pub record: SubPoolRecord,
    pub member_allocations: Vec<Allocation>,
}

/// The complete pre-pooling workflow result.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct PrepoolPlan {
    pub prepools: Vec<PrepoolResult>,
    /// The final pool over standalone libraries plus pre-pool entities.
    pub final_pool: Vec<Allocation>,
    pub total_libraries: usize,
    pub libraries_in_prepools: usize,
    pub standalone_libraries: usize,
}

/// Check pre-pool definitions against the library set: members must
/// exist, belong to at most one pre-pool, ids must be unique and no
/// pre-pool may be empty.
pub fn validate_definitions(
    libraries: &[NormalizedLibrary],
    definitions: &[PrepoolDefinition],
) -> Result<(), PoolError> {
    let known: HashSet<&str> = libraries
        .iter()
        .map(|l| l.record.library_name.as_str())
        .collect();
    let mut seen_ids = HashSet::new();
    let mut seen_members = HashSet::new();
    for definition in definitions {
        if !seen_ids.insert(definition.prepool_id.as_str()) {
            return Err(PoolError::DuplicatePrepoolId {
                prepool: definition.prepool_id.clone(),
            });
        }
        if definition.member_library_names.is_empty() {
            return Err(PoolError::EmptyPrepool {
                prepool: definition.prepool_name.clone(),
            });
        }
        for member in &definition.member_library_names {
            if !known.contains(member.as_str()) {
                return Err(PoolError::UnknownLibrary {
                    prepool: definition.prepool_name.clone(),
                    library: member.clone(),
                });
            }
            if !seen_members.insert(member.as_str()) {
                return Err(PoolError::DuplicatePrepoolMember {
                    library: member.clone(),
                });
            }
        }
    }
    Ok(())
}

fn prepool_record(
    definition: &PrepoolDefinition,
    members: &[NormalizedLibrary],
    allocations: &[Allocation],
) -> SubPoolRecord {
    let total_volume_ul: f64 = allocations.iter().map(|a| a.final_volume_ul).sum();
    // Pre-pool concentration follows the adj-lib-pmol convention: each
    // member contributes target_weight/10 pmol, so the concentration
    // reflects the weighted read targets rather than the mixed molarity.
    let total_pmol: f64 = members
        .iter()
        .map(|m| m.record.target_weight * PMOL_PER_TARGET_READ_M)
        .sum();
    let calculated_nm = if total_volume_ul > 0.0 {
        total_pmol / total_volume_ul
    } else {
        0.0
    };
    SubPoolRecord {
        subpool_id: definition.prepool_id.clone(),
        member_libraries: members
            .iter()
            .map(|m| m.record.library_name.clone())
            .collect(),
        project_id: None,
        calculated_nm,
        total_volume_ul,
        target_weight: members.iter().map(|m| m.record.target_weight).sum(),
    }
}

/// Run the pre-pooling workflow: allocate within each pre-pool, then
/// pool the pre-pool entities together with the standalone libraries.
pub fn compose_with_prepools(
    libraries: &[NormalizedLibrary],
    definitions: &[PrepoolDefinition],
    params: &PoolingParams,
    config: &PoolingConfig,
) -> Result<PrepoolPlan> {
    params.validate()?;
    config.validate()?;
    validate_definitions(libraries, definitions)?;

    let member_params = PoolingParams {
        total_reads_m: None,
        ..params.clone()
    };
    let mut prepools = Vec::with_capacity(definitions.len());
    let mut pooled_names: HashSet<&str> = HashSet::new();
    for definition in definitions {
        // Members keep library input order, not selection order.
        let members: Vec<NormalizedLibrary> = libraries
            .iter()
            .filter(|l| {
                definition
                    .member_library_names
                    .iter()
                    .any(|name| name == &l.record.library_name)
            })
            .cloned()
            .collect();
        let member_allocations = allocate(&members, &member_params, config)?;
        let record = prepool_record(definition, &members, &member_allocations);
        pooled_names.extend(definition.member_library_names.iter().map(String::as_str));
        prepools.push(PrepoolResult {
            definition: definition.clone(),
            record,
            member_allocations,
        });
    }

    let mut final_entities: Vec<PoolEntity> = libraries
        .iter()
        .filter(|l| !pooled_names.contains(l.record.library_name.as_str()))
        .cloned()
        .map(PoolEntity::Library)
        .collect();
    let standalone_libraries = final_entities.len();
    final_entities.extend(
        prepools
            .iter()
            .map(|p| PoolEntity::Pool(p.record.clone())),
    );
    let final_pool = allocate(&final_entities, params, config)?;

    Ok(PrepoolPlan {
        total_libraries: libraries.len(),
        libraries_in_prepools: pooled_names.len(),
        standalone_libraries,
        prepools,
        final_pool,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pool_types::LibraryRecord;

    fn library(name: &str, nm: f64, weight: f64) -> NormalizedLibrary {
        NormalizedLibrary {
            record: LibraryRecord {
                project_id: "P1".to_string(),
                library_name: name.to_string(),
                barcode: format!("BC-{name}"),
                concentration_ng_ul: 1.0,
                fragment_size_bp: 200.0,
                available_volume_ul: 1e6,
                empirical_nm: Some(nm),
                target_weight: weight,
            },
            computed_nm: nm,
            effective_nm: nm,
        }
    }

    fn definition(id: &str, members: &[&str]) -> PrepoolDefinition {
        PrepoolDefinition {
            prepool_id: id.to_string(),
            prepool_name: id.to_string(),
            member_library_names: members.iter().map(|m| m.to_string()).collect(),
            notes: None,
        }
    }

    #[test]
    fn test_overlapping_members_rejected() {
        let libraries = vec![library("L1", 10.0, 10.0), library("L2", 10.0, 10.0)];
        let err = validate_definitions(
            &libraries,
            &[definition("pre_1", &["L1"]), definition("pre_2", &["L1"])],
        )
        .unwrap_err();
        assert_eq!(
            err,
            PoolError::DuplicatePrepoolMember {
                library: "L1".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_member_rejected() {
        let libraries = vec![library("L1", 10.0, 10.0)];
        let err =
            validate_definitions(&libraries, &[definition("pre_1", &["missing"])]).unwrap_err();
        assert_eq!(
            err,
            PoolError::UnknownLibrary {
                prepool: "pre_1".to_string(),
                library: "missing".to_string()
            }
        );
    }

    #[test]
    fn test_final_pool_mixes_standalones_and_prepools() {
        let libraries = vec![
            library("L1", 10.0, 10.0),
            library("L2", 20.0, 10.0),
            library("L3", 15.0, 100.0),
        ];
        let plan = compose_with_prepools(
            &libraries,
            &[definition("pre_1", &["L1", "L2"])],
            &PoolingParams::default(),
            &PoolingConfig::default(),
        )
        .unwrap();
        assert_eq!(plan.total_libraries, 3);
        assert_eq!(plan.libraries_in_prepools, 2);
        assert_eq!(plan.standalone_libraries, 1);
        let names: Vec<&str> = plan.final_pool.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["L3", "pre_1"]);
        let fractions: f64 = plan.final_pool.iter().map(|a| a.pool_fraction).sum();
        assert!((fractions - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_prepool_concentration_uses_pmol_convention() {
        let libraries = vec![library("L1", 10.0, 10.0), library("L2", 20.0, 30.0)];
        let plan = compose_with_prepools(
            &libraries,
            &[definition("pre_1", &["L1", "L2"])],
            &PoolingParams::default(),
            &PoolingConfig::default(),
        )
        .unwrap();
        let record = &plan.prepools[0].record;
        let total_volume: f64 = plan.prepools[0]
            .member_allocations
            .iter()
            .map(|a| a.final_volume_ul)
            .sum();
        let expected_nm = (10.0 / 10.0 + 30.0 / 10.0) / total_volume;
        assert!((record.calculated_nm - expected_nm).abs() < 1e-12);
        assert_eq!(record.target_weight, 40.0);
    }
}
