//! Tabular export of computed plans.
//!
//! Column names match the spreadsheet the results flow back into, so a
//! round trip through this exporter lines up with the lab's template.

use anyhow::Result;
use itertools::Itertools;
use pool_types::{ComputedLibrary, GroupSummary, HierarchicalPlan, PoolingStage};
use pooling::SingleStagePlan;
use std::io::Write;

fn optional(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(String::new, |v| format!("{v:.precision$}"))
}

fn flags_cell(flags: &[impl ToString]) -> String {
    flags.iter().map(ToString::to_string).join("; ")
}

/// Write the per-library result table as CSV.
pub fn write_library_csv<W: Write>(writer: W, libraries: &[ComputedLibrary]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "Project ID",
        "Library Name",
        "Barcodes",
        "Final ng/ul",
        "Adjusted peak size",
        "Empirical Library nM",
        "Calculated nM",
        "Effective nM (Use)",
        "Target Reads (M)",
        "Stock Volume (µl)",
        "Pre-Dilute Factor",
        "Final Volume (µl)",
        "Pool Fraction",
        "Expected Reads (M)",
        "Flags",
    ])?;
    for library in libraries {
        let record = &library.library.record;
        csv.write_record([
            record.project_id.clone(),
            record.library_name.clone(),
            record.barcode.clone(),
            format!("{:.3}", record.concentration_ng_ul),
            format!("{:.0}", record.fragment_size_bp),
            optional(record.empirical_nm, 3),
            format!("{:.3}", library.library.computed_nm),
            format!("{:.3}", library.library.effective_nm),
            format!("{:.2}", record.target_weight),
            format!("{:.4}", library.stock_volume_ul),
            format!("{:.0}", library.predilute_factor),
            format!("{:.4}", library.final_volume_ul),
            format!("{:.4}", library.pool_fraction),
            optional(library.expected_reads_m, 2),
            flags_cell(&library.flags),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the per-project rollup as CSV.
pub fn write_summary_csv<W: Write>(writer: W, summaries: &[GroupSummary]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "Project ID",
        "Library Count",
        "Total Volume (µl)",
        "Pool Fraction",
        "Expected Reads (M)",
    ])?;
    for summary in summaries {
        csv.write_record([
            summary.group_id.clone(),
            summary.entity_count.to_string(),
            format!("{:.4}", summary.total_volume_ul),
            format!("{:.4}", summary.pool_fraction),
            optional(summary.expected_reads_m, 2),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write one hierarchical stage's entries as CSV.
pub fn write_stage_csv<W: Write>(writer: W, stage: &PoolingStage) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "Name",
        "SubPool ID",
        "Effective nM",
        "Target Reads (M)",
        "Stock Volume (µl)",
        "Pre-Dilute Factor",
        "Final Volume (µl)",
        "Pool Fraction",
        "Expected Reads (M)",
        "Flags",
    ])?;
    for entry in &stage.entries {
        csv.write_record([
            entry.name.clone(),
            entry.subpool_id.clone().unwrap_or_default(),
            format!("{:.3}", entry.effective_nm),
            format!("{:.2}", entry.target_weight),
            format!("{:.4}", entry.stock_volume_ul),
            format!("{:.0}", entry.predilute_factor),
            format!("{:.4}", entry.final_volume_ul),
            format!("{:.4}", entry.pool_fraction),
            optional(entry.expected_reads_m, 2),
            flags_cell(&entry.flags),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Dump a single-stage plan as JSON.
pub fn write_single_stage_json<W: Write>(writer: W, plan: &SingleStagePlan) -> Result<()> {
    serde_json::to_writer_pretty(writer, plan)?;
    Ok(())
}

/// Dump a hierarchical plan as JSON.
pub fn write_hierarchical_json<W: Write>(writer: W, plan: &HierarchicalPlan) -> Result<()> {
    serde_json::to_writer_pretty(writer, plan)?;
    Ok(())
}
