//! Field-level validation of a typed library table.
//!
//! Runs after ingestion and before any computation. Errors block the
//! run; warnings are advisory and shown alongside the results.

use itertools::Itertools;
use pool_types::config::{
    MIN_CONCENTRATION_NG_UL, MIN_FRAGMENT_SIZE_BP, MIN_TOTAL_VOLUME_UL, MW_PER_BP,
    WARN_HIGH_CONCENTRATION_NG_UL, WARN_HIGH_FRAGMENT_SIZE_BP, WARN_LOW_CONCENTRATION_NG_UL,
    WARN_LOW_FRAGMENT_SIZE_BP, WARN_LOW_MOLARITY_NM, WARN_LOW_TOTAL_VOLUME_UL,
};
use pool_types::LibraryRecord;
use std::collections::HashMap;

/// Outcome of validating a library table.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Human-readable report, errors first.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        if !self.errors.is_empty() {
            lines.push("ERRORS:".to_string());
            lines.extend(self.errors.iter().map(|e| format!("  - {e}")));
        }
        if !self.warnings.is_empty() {
            lines.push("WARNINGS:".to_string());
            lines.extend(self.warnings.iter().map(|w| format!("  - {w}")));
        }
        lines.join("\n")
    }
}

fn check_duplicates<'a, F>(
    records: &'a [LibraryRecord],
    field: &str,
    extract: F,
    report: &mut ValidationReport,
) where
    F: Fn(&'a LibraryRecord) -> &'a str,
{
    let mut rows_by_value: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        rows_by_value.entry(extract(record)).or_default().push(i + 1);
    }
    for (value, rows) in rows_by_value.into_iter().sorted() {
        if rows.len() > 1 {
            report.errors.push(format!(
                "Duplicate {field} '{value}' in rows {}",
                rows.iter().join(", ")
            ));
        }
    }
}

/// Validate a typed library table against the domain thresholds.
pub fn validate_records(records: &[LibraryRecord]) -> ValidationReport {
    let mut report = ValidationReport::default();
    if records.is_empty() {
        report.errors.push("Library table has no rows".to_string());
        return report;
    }

    for (i, record) in records.iter().enumerate() {
        let row = i + 1;
        for (field, value) in [
            ("Project ID", &record.project_id),
            ("Library Name", &record.library_name),
            ("Barcodes", &record.barcode),
        ] {
            if value.trim().is_empty() {
                report.errors.push(format!("Row {row}, {field}: value cannot be empty"));
            }
        }

        let conc = record.concentration_ng_ul;
        if conc < MIN_CONCENTRATION_NG_UL {
            report.errors.push(format!(
                "Row {row}, Final ng/ul: concentration {conc} ng/µl is below the usable minimum \
                 ({MIN_CONCENTRATION_NG_UL} ng/µl)"
            ));
        } else if conc < WARN_LOW_CONCENTRATION_NG_UL {
            report.warnings.push(format!(
                "Row {row}, Final ng/ul: very low concentration ({conc:.3} ng/µl) - library may \
                 be too dilute"
            ));
        } else if conc > WARN_HIGH_CONCENTRATION_NG_UL {
            report.warnings.push(format!(
                "Row {row}, Final ng/ul: very high concentration ({conc:.1} ng/µl) - consider \
                 diluting"
            ));
        }

        let size = record.fragment_size_bp;
        if size < MIN_FRAGMENT_SIZE_BP {
            report.errors.push(format!(
                "Row {row}, Adjusted peak size: fragment size {size} bp is below the usable \
                 minimum ({MIN_FRAGMENT_SIZE_BP} bp)"
            ));
        } else if size < WARN_LOW_FRAGMENT_SIZE_BP {
            report
                .warnings
                .push(format!("Row {row}, Adjusted peak size: short fragment ({size} bp)"));
        } else if size > WARN_HIGH_FRAGMENT_SIZE_BP {
            report
                .warnings
                .push(format!("Row {row}, Adjusted peak size: long fragment ({size} bp)"));
        }

        let volume = record.available_volume_ul;
        if volume < MIN_TOTAL_VOLUME_UL {
            report.errors.push(format!(
                "Row {row}, Total Volume: volume {volume} µl is below the usable minimum \
                 ({MIN_TOTAL_VOLUME_UL} µl)"
            ));
        } else if volume < WARN_LOW_TOTAL_VOLUME_UL {
            report.warnings.push(format!(
                "Row {row}, Total Volume: low volume ({volume:.1} µl) - may be insufficient for \
                 pooling"
            ));
        }

        if conc >= MIN_CONCENTRATION_NG_UL && size >= MIN_FRAGMENT_SIZE_BP {
            let nm = match record.empirical_nm {
                Some(empirical) if empirical > 0.0 => empirical,
                _ => conc * 1e6 / (MW_PER_BP * size),
            };
            if nm < WARN_LOW_MOLARITY_NM {
                report.warnings.push(format!(
                    "Row {row}: effective molarity {nm:.4} nM is very low - expect a large \
                     pipetting volume"
                ));
            }
        }

        if record.target_weight <= 0.0 {
            report.errors.push(format!(
                "Row {row}, Target Reads (M): must be > 0, got {}",
                record.target_weight
            ));
        }
        if let Some(nm) = record.empirical_nm {
            if nm <= 0.0 {
                report.errors.push(format!(
                    "Row {row}, Empirical Library nM: must be > 0 when present, got {nm}"
                ));
            }
        }
    }

    check_duplicates(records, "Library Name", |r| &r.library_name, &mut report);
    check_duplicates(records, "Barcodes", |r| &r.barcode, &mut report);
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, barcode: &str) -> LibraryRecord {
        LibraryRecord {
            project_id: "P1".to_string(),
            library_name: name.to_string(),
            barcode: barcode.to_string(),
            concentration_ng_ul: 1.5,
            fragment_size_bp: 200.0,
            available_volume_ul: 30.0,
            empirical_nm: None,
            target_weight: 10.0,
        }
    }

    #[test]
    fn test_clean_table_passes() {
        let report = validate_records(&[record("L1", "A"), record("L2", "B")]);
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_duplicate_names_and_barcodes_block() {
        let report = validate_records(&[record("L1", "A"), record("L1", "A")]);
        assert!(!report.is_valid());
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].contains("rows 1, 2"));
    }

    #[test]
    fn test_low_concentration_warns_not_blocks() {
        let mut low = record("L1", "A");
        low.concentration_ng_ul = 0.05;
        let report = validate_records(&[low]);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("very low concentration"));
    }

    #[test]
    fn test_low_molarity_warns() {
        // 0.01 ng/µl at 10 kbp is ~0.0015 nM, well under the 0.1 nM
        // advisory threshold but above every blocking minimum.
        let mut dilute = record("L1", "A");
        dilute.concentration_ng_ul = 0.01;
        dilute.fragment_size_bp = 10_000.0;
        let report = validate_records(&[dilute]);
        assert!(report.is_valid());
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("effective molarity")));
    }

    #[test]
    fn test_empty_table_blocks() {
        assert!(!validate_records(&[]).is_valid());
    }
}
