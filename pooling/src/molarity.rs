//! Mass concentration to molarity conversion.

use pool_types::{Flag, LibraryRecord, NormalizedLibrary, PoolingConfig};
use serde::{Deserialize, Serialize};

/// Convert a mass concentration (ng/µl) and fragment length (bp) to a
/// molar concentration (nM).
///
/// ng/µl is the same as µg/ml, so dividing by the fragment's molecular
/// weight (mw_per_bp g/mol per base pair) and shifting units gives
/// `nM = ng/µl * 1e6 / (mw_per_bp * bp)`.
pub fn molarity_from_concentration(
    concentration_ng_ul: f64,
    fragment_size_bp: f64,
    config: &PoolingConfig,
) -> f64 {
    concentration_ng_ul * 1e6 / (config.mw_per_bp * fragment_size_bp)
}

/// A library dropped from allocation, with the reason attached.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ExcludedLibrary {
    pub record: LibraryRecord,
    pub computed_nm: f64,
    pub flag: Flag,
}

/// Result of resolving molarity over a library set. Always has a
/// consistent shape: every input record lands in exactly one of the two
/// lists.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct NormalizeOutcome {
    pub libraries: Vec<NormalizedLibrary>,
    pub excluded: Vec<ExcludedLibrary>,
}

/// Resolve the effective molarity of each library.
///
/// The empirical (qPCR) value wins whenever it is present and positive;
/// otherwise the value computed from concentration and fragment size is
/// used. Libraries whose effective molarity comes out non-positive or
/// non-finite are excluded from allocation and reported, not silently
/// dropped.
pub fn normalize_libraries(
    records: Vec<LibraryRecord>,
    config: &PoolingConfig,
) -> NormalizeOutcome {
    let mut outcome = NormalizeOutcome::default();
    for record in records {
        let computed_nm =
            molarity_from_concentration(record.concentration_ng_ul, record.fragment_size_bp, config);
        let effective_nm = match record.empirical_nm {
            Some(empirical) if empirical > 0.0 => empirical,
            _ => computed_nm,
        };
        if effective_nm > 0.0 && effective_nm.is_finite() {
            outcome.libraries.push(NormalizedLibrary {
                record,
                computed_nm,
                effective_nm,
            });
        } else {
            log::warn!(
                "excluding library '{}': effective molarity {effective_nm} nM",
                record.library_name
            );
            outcome.excluded.push(ExcludedLibrary {
                record,
                computed_nm,
                flag: Flag::InvalidMolarity,
            });
        }
    }
    outcome
}
