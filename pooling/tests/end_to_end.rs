//! End-to-end run over a small real-world dataset: 12 miRNA libraries
//! with fragment sizes around 198 bp and target reads alternating
//! between 100M and 10M.

use pool_types::{Flag, LibraryRecord, PoolingConfig, PoolingParams};
use pooling::plan_single_stage;

fn dataset() -> Vec<LibraryRecord> {
    let rows: [(&str, f64, f64, f64); 12] = [
        ("EF19", 1.7766, 198.0, 20.0),
        ("EF20", 3.2610, 197.0, 20.0),
        ("EF21", 2.4155, 199.0, 20.0),
        ("EF22", 0.9120, 198.0, 20.0),
        ("EF23", 1.1050, 196.0, 20.0),
        ("EF24", 2.8900, 198.0, 20.0),
        ("EF25", 0.5430, 197.0, 20.0),
        ("EF26", 1.9901, 199.0, 20.0),
        ("EF27", 3.1020, 198.0, 20.0),
        ("EF28", 0.7705, 197.0, 20.0),
        ("EF29", 0.1000, 196.0, 10.0),
        ("EF30", 2.2340, 198.0, 20.0),
    ];
    rows.iter()
        .enumerate()
        .map(|(i, &(name, ng_ul, bp, volume))| LibraryRecord {
            project_id: format!("Project_{}", if i < 6 { "A" } else { "B" }),
            library_name: name.to_string(),
            barcode: format!("BC{i:02}"),
            concentration_ng_ul: ng_ul,
            fragment_size_bp: bp,
            available_volume_ul: volume,
            empirical_nm: None,
            target_weight: if i % 2 == 0 { 100.0 } else { 10.0 },
        })
        .collect()
}

#[test]
fn test_reference_dataset_single_stage() {
    let plan = plan_single_stage(
        dataset(),
        &PoolingParams::default(),
        &PoolingConfig::default(),
    )
    .unwrap();
    assert_eq!(plan.libraries.len(), 12);
    assert!(plan.excluded.is_empty());

    let ef19 = plan
        .libraries
        .iter()
        .find(|l| l.library.record.library_name == "EF19")
        .unwrap();
    assert!((ef19.library.computed_nm - 13.595).abs() < 0.001);
    assert!((ef19.stock_volume_ul - 0.736).abs() < 0.001);
    assert!(
        (ef19.final_volume_ul - ef19.stock_volume_ul * ef19.predilute_factor).abs() < 1e-12
    );

    // EF29 is very dilute: 0.1 ng/µl at 196 bp works out to ~0.773 nM,
    // so its 100M target needs ~12.94 µl, more than the 10 µl on hand.
    let ef29 = plan
        .libraries
        .iter()
        .find(|l| l.library.record.library_name == "EF29")
        .unwrap();
    assert!((ef29.library.computed_nm - 0.773).abs() < 0.001);
    assert!((ef29.stock_volume_ul - 12.94).abs() < 0.01);
    assert_eq!(ef29.predilute_factor, 1.0);
    assert!(ef29.flags.contains(&Flag::InsufficientSampleVolume));

    // Fractions conserve across the whole set and across the rollup.
    let total: f64 = plan.libraries.iter().map(|l| l.pool_fraction).sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert_eq!(plan.summaries.len(), 2);
    let rollup: f64 = plan.summaries.iter().map(|s| s.pool_fraction).sum();
    assert!((rollup - 1.0).abs() < 1e-9);
}

#[test]
fn test_invariant_final_equals_stock_times_factor() {
    let plan = plan_single_stage(
        dataset(),
        &PoolingParams::default(),
        &PoolingConfig::default(),
    )
    .unwrap();
    for library in &plan.libraries {
        assert!(
            (library.final_volume_ul - library.stock_volume_ul * library.predilute_factor).abs()
                < 1e-12,
            "{}",
            library.library.record.library_name
        );
    }
}
