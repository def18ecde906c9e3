//! Library and sub-pool records.

use crate::flags::Flag;
use serde::{Deserialize, Serialize};

/// One library as it arrives from the validated input table.
///
/// Structural validation (types, uniqueness, presence) has already
/// happened upstream; the computation crate only re-checks numeric
/// domains it derives itself.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct LibraryRecord {
    /// Project identifier, the default grouping key.
    pub project_id: String,
    /// Unique library identifier.
    pub library_name: String,
    /// Unique barcode/index sequence. Not used by any calculation but
    /// carried through for export.
    pub barcode: String,
    /// Mass concentration in ng/µl.
    pub concentration_ng_ul: f64,
    /// Average fragment length in base pairs.
    pub fragment_size_bp: f64,
    /// Volume of sample on hand, in µl.
    pub available_volume_ul: f64,
    /// Optional qPCR-measured molarity in nM; overrides the computed
    /// value when present and positive.
    pub empirical_nm: Option<f64>,
    /// Relative desired molecular contribution (target reads, M).
    pub target_weight: f64,
}

/// A library with its molarity resolved.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct NormalizedLibrary {
    #[serde(flatten)]
    pub record: LibraryRecord,
    /// Molarity computed from concentration and fragment size (nM).
    pub computed_nm: f64,
    /// The authoritative molarity: empirical when supplied, else
    /// computed (nM).
    pub effective_nm: f64,
}

/// A library with all derived pooling fields attached. Never mutated
/// once the allocation pass completes.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ComputedLibrary {
    #[serde(flatten)]
    pub library: NormalizedLibrary,
    /// Volume from the proportional formula, before dilution (µl).
    pub stock_volume_ul: f64,
    /// Dilution applied to the source before drawing (1, 5 or 10).
    pub predilute_factor: f64,
    /// Volume actually pipetted: stock volume times dilution factor (µl).
    pub final_volume_ul: f64,
    /// Share of total molecular content in the pool (0-1).
    pub pool_fraction: f64,
    /// Expected reads (M), present only when a run total was supplied.
    pub expected_reads_m: Option<f64>,
    pub flags: Vec<Flag>,
}

/// An intermediate pool synthesized from a group of libraries after the
/// first allocation pass. Treated as a single entity by the second pass.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct SubPoolRecord {
    pub subpool_id: String,
    /// Member library names, in input order.
    pub member_libraries: Vec<String>,
    /// Project the members came from, when grouped by project.
    pub project_id: Option<String>,
    /// Volume-weighted average concentration of the members (nM), so
    /// molar content is conserved under grouping.
    pub calculated_nm: f64,
    /// Sum of member final volumes (µl).
    pub total_volume_ul: f64,
    /// Sum of member target weights.
    pub target_weight: f64,
}

/// Per-group rollup of an allocation result.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct GroupSummary {
    pub group_id: String,
    pub entity_count: usize,
    pub total_volume_ul: f64,
    pub pool_fraction: f64,
    /// Omitted if any member lacks an expected-reads value.
    pub expected_reads_m: Option<f64>,
}

/// Anything the allocator can draw into a pool.
///
/// Libraries and sub-pools are structurally the same shape as far as
/// allocation is concerned, so the allocator and the constraint checks
/// are written once against this trait and reused unmodified for both
/// pooling stages.
pub trait Poolable {
    fn name(&self) -> &str;
    /// Authoritative molar concentration (nM).
    fn effective_nm(&self) -> f64;
    /// Relative desired molecular contribution.
    fn target_weight(&self) -> f64;
    /// Volume ceiling for this entity (µl).
    fn available_volume_ul(&self) -> f64;
}

impl Poolable for NormalizedLibrary {
    fn name(&self) -> &str {
        &self.record.library_name
    }

    fn effective_nm(&self) -> f64 {
        self.effective_nm
    }

    fn target_weight(&self) -> f64 {
        self.record.target_weight
    }

    fn available_volume_ul(&self) -> f64 {
        self.record.available_volume_ul
    }
}

/// Either concrete poolable variant, for pools that mix standalone
/// libraries with already-combined pools in one allocation pass.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(untagged)]
pub enum PoolEntity {
    Library(NormalizedLibrary),
    Pool(SubPoolRecord),
}

impl Poolable for PoolEntity {
    fn name(&self) -> &str {
        match self {
            PoolEntity::Library(library) => library.name(),
            PoolEntity::Pool(pool) => pool.name(),
        }
    }

    fn effective_nm(&self) -> f64 {
        match self {
            PoolEntity::Library(library) => library.effective_nm(),
            PoolEntity::Pool(pool) => pool.effective_nm(),
        }
    }

    fn target_weight(&self) -> f64 {
        match self {
            PoolEntity::Library(library) => library.target_weight(),
            PoolEntity::Pool(pool) => pool.target_weight(),
        }
    }

    fn available_volume_ul(&self) -> f64 {
        match self {
            PoolEntity::Library(library) => library.available_volume_ul(),
            PoolEntity::Pool(pool) => pool.available_volume_ul(),
        }
    }
}

impl Poolable for SubPoolRecord {
    fn name(&self) -> &str {
        &self.subpool_id
    }

    fn effective_nm(&self) -> f64 {
        self.calculated_nm
    }

    fn target_weight(&self) -> f64 {
        self.target_weight
    }

    fn available_volume_ul(&self) -> f64 {
        self.total_volume_ul
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> LibraryRecord {
        LibraryRecord {
            project_id: "P1".to_string(),
            library_name: "L1".to_string(),
            barcode: "ACGT".to_string(),
            concentration_ng_ul: 1.7766,
            fragment_size_bp: 198.0,
            available_volume_ul: 20.0,
            empirical_nm: None,
            target_weight: 100.0,
        }
    }

    #[test]
    fn test_library_record_json_round_trip() {
        let original = record();
        let json = serde_json::to_string(&original).unwrap();
        let parsed: LibraryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_normalized_library_flattens_record_fields() {
        let library = NormalizedLibrary {
            record: record(),
            computed_nm: 13.595,
            effective_nm: 13.595,
        };
        let value: serde_json::Value = serde_json::to_value(&library).unwrap();
        // Flattened: record fields sit at the top level next to the
        // derived molarities.
        assert_eq!(value["library_name"], "L1");
        assert_eq!(value["computed_nm"], 13.595);
        assert!(value.get("record").is_none());
    }

    #[test]
    fn test_pool_entity_untagged_round_trip() {
        let entity = PoolEntity::Pool(SubPoolRecord {
            subpool_id: "P1_pool".to_string(),
            member_libraries: vec!["L1".to_string(), "L2".to_string()],
            project_id: Some("P1".to_string()),
            calculated_nm: 4.2,
            total_volume_ul: 3.5,
            target_weight: 110.0,
        });
        let json = serde_json::to_string(&entity).unwrap();
        let parsed: PoolEntity = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entity);
        assert_eq!(parsed.name(), "P1_pool");
    }
}
