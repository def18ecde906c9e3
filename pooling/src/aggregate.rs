//! Per-group rollups of an allocation result.

use pool_types::{ComputedLibrary, GroupSummary};
use std::collections::HashMap;

/// Roll library-level results up into one summary per group, in
/// first-seen group order.
///
/// The expected-reads sum is only reported when every member carries a
/// value; a partial sum would misread as a group total.
pub fn aggregate_by<'a, F>(libraries: &'a [ComputedLibrary], key_fn: F) -> Vec<GroupSummary>
where
    F: Fn(&'a ComputedLibrary) -> &'a str,
{
    let mut order: Vec<GroupSummary> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for library in libraries {
        let key = key_fn(library);
        let i = *index.entry(key).or_insert_with(|| {
            order.push(GroupSummary {
                group_id: key.to_string(),
                entity_count: 0,
                total_volume_ul: 0.0,
                pool_fraction: 0.0,
                expected_reads_m: Some(0.0),
            });
            order.len() - 1
        });
        let summary = &mut order[i];
        summary.entity_count += 1;
        summary.total_volume_ul += library.final_volume_ul;
        summary.pool_fraction += library.pool_fraction;
        summary.expected_reads_m = match (summary.expected_reads_m, library.expected_reads_m) {
            (Some(sum), Some(reads)) => Some(sum + reads),
            _ => None,
        };
    }
    order
}

/// Group by project id, the default rollup.
pub fn aggregate_by_project(libraries: &[ComputedLibrary]) -> Vec<GroupSummary> {
    aggregate_by(libraries, |library| &library.library.record.project_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pool_types::{LibraryRecord, NormalizedLibrary};
    use pretty_assertions::assert_eq;

    fn computed(project: &str, name: &str, volume: f64, fraction: f64, reads: Option<f64>) -> ComputedLibrary {
        ComputedLibrary {
            library: NormalizedLibrary {
                record: LibraryRecord {
                    project_id: project.to_string(),
                    library_name: name.to_string(),
                    barcode: format!("BC-{name}"),
                    concentration_ng_ul: 1.0,
                    fragment_size_bp: 200.0,
                    available_volume_ul: 30.0,
                    empirical_nm: None,
                    target_weight: 10.0,
                },
                computed_nm: 7.5,
                effective_nm: 7.5,
            },
            stock_volume_ul: volume,
            predilute_factor: 1.0,
            final_volume_ul: volume,
            pool_fraction: fraction,
            expected_reads_m: reads,
            flags: Vec::new(),
        }
    }

    #[test]
    fn test_groups_keep_first_seen_order() {
        let libraries = vec![
            computed("B", "L1", 1.0, 0.25, Some(10.0)),
            computed("A", "L2", 2.0, 0.25, Some(20.0)),
            computed("B", "L3", 3.0, 0.5, Some(30.0)),
        ];
        let summaries = aggregate_by_project(&libraries);
        assert_eq!(
            summaries,
            vec![
                GroupSummary {
                    group_id: "B".to_string(),
                    entity_count: 2,
                    total_volume_ul: 4.0,
                    pool_fraction: 0.75,
                    expected_reads_m: Some(40.0),
                },
                GroupSummary {
                    group_id: "A".to_string(),
                    entity_count: 1,
                    total_volume_ul: 2.0,
                    pool_fraction: 0.25,
                    expected_reads_m: Some(20.0),
                },
            ]
        );
    }

    #[test]
    fn test_fraction_total_is_preserved_across_groups() {
        let libraries = vec![
            computed("A", "L1", 1.0, 0.4, None),
            computed("B", "L2", 1.0, 0.35, None),
            computed("C", "L3", 1.0, 0.25, None),
        ];
        let total: f64 = aggregate_by_project(&libraries)
            .iter()
            .map(|s| s.pool_fraction)
            .sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_member_reads_drops_group_sum() {
        let libraries = vec![
            computed("A", "L1", 1.0, 0.5, Some(10.0)),
            computed("A", "L2", 1.0, 0.5, None),
        ];
        assert_eq!(aggregate_by_project(&libraries)[0].expected_reads_m, None);
    }
}
