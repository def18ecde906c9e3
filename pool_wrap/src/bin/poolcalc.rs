//! poolcalc: compute pipetting volumes for pooling sequencing libraries.

use anyhow::{bail, Context, Result};
use clap::Parser;
use pool_types::params::{DEFAULT_MAX_PER_POOL, DEFAULT_MIN_GROUPS_FOR_HIERARCHICAL};
use pool_types::{HierarchyParams, PoolingConfig, PoolingParams};
use pool_wrap::export::{
    write_hierarchical_json, write_library_csv, write_single_stage_json, write_stage_csv,
    write_summary_csv,
};
use pool_wrap::table::read_library_table;
use pool_wrap::validate::validate_records;
use pooling::{plan_hierarchical, plan_single_stage, strategy, Strategy};
use std::fs::{create_dir_all, File};
use std::path::PathBuf;

const CMD: &str = "poolcalc";

/// Compute pipetting volumes for weighted pooling of sequencing
/// libraries.
#[derive(Parser, Debug)]
#[clap(name = CMD, version)]
struct Poolcalc {
    #[clap(subcommand)]
    subcmd: SubCommand,
}

#[derive(Parser, Debug)]
enum SubCommand {
    /// Compute a pooling plan and write result tables.
    #[clap(name = "plan")]
    Plan(Plan),

    /// Recommend single-stage vs. hierarchical pooling for a table.
    #[clap(name = "strategy")]
    Strategy(StrategyCmd),
}

#[derive(Parser, Debug, Clone)]
struct SharedArgs {
    /// Library table CSV.
    #[clap(long, short = 'i')]
    input: PathBuf,

    /// Maximum libraries handled in one pooling operation.
    #[clap(long, default_value_t = DEFAULT_MAX_PER_POOL)]
    max_per_pool: usize,

    /// Minimum sub-pool count that justifies a hierarchical run.
    #[clap(long, default_value_t = DEFAULT_MIN_GROUPS_FOR_HIERARCHICAL)]
    min_groups: usize,
}

#[derive(Parser, Debug)]
struct Plan {
    #[clap(flatten)]
    shared: SharedArgs,

    /// Directory for the output tables.
    #[clap(long, short = 'o', default_value = "pooling_out")]
    output_dir: PathBuf,

    /// Force a two-stage hierarchical plan.
    #[clap(long, conflicts_with = "single_stage")]
    hierarchical: bool,

    /// Force a flat single-pool plan.
    #[clap(long)]
    single_stage: bool,

    /// Volume-formula scaling factor.
    #[clap(long, default_value_t = PoolingParams::default().scaling_factor)]
    scaling_factor: f64,

    /// Minimum pipettable volume (µl).
    #[clap(long, default_value_t = PoolingParams::default().min_pipette_volume_ul)]
    min_volume: f64,

    /// Maximum volume per pipetting step (µl).
    #[clap(long)]
    max_volume: Option<f64>,

    /// Total sequencing reads (M), enables expected-reads reporting.
    #[clap(long)]
    total_reads: Option<f64>,
}

#[derive(Parser, Debug)]
struct StrategyCmd {
    #[clap(flatten)]
    shared: SharedArgs,
}

fn load_records(shared: &SharedArgs) -> Result<Vec<pool_types::LibraryRecord>> {
    let records = read_library_table(&shared.input)?;
    let report = validate_records(&records);
    if !report.warnings.is_empty() {
        for warning in &report.warnings {
            log::warn!("{warning}");
        }
    }
    if !report.is_valid() {
        bail!("library table failed validation:\n{}", report.render());
    }
    Ok(records)
}

fn run_plan(args: Plan) -> Result<()> {
    let records = load_records(&args.shared)?;
    let params = PoolingParams {
        scaling_factor: args.scaling_factor,
        min_pipette_volume_ul: args.min_volume,
        max_volume_ul: args.max_volume,
        total_reads_m: args.total_reads,
    };
    params.validate()?;
    let config = PoolingConfig::default();

    let recommendation =
        strategy::select(&records, args.shared.max_per_pool, args.shared.min_groups)?;
    let hierarchical = if args.single_stage {
        false
    } else if args.hierarchical {
        true
    } else {
        recommendation.strategy == Strategy::Hierarchical
    };
    log::info!(
        "{} ({})",
        recommendation.reason,
        if hierarchical { "hierarchical" } else { "single stage" }
    );
    if let Some(warning) = &recommendation.warning {
        log::warn!("{warning}");
    }

    create_dir_all(&args.output_dir)
        .with_context(|| format!("Error creating {}", args.output_dir.display()))?;
    let out = |name: &str| -> Result<File> {
        let path = args.output_dir.join(name);
        File::create(&path).with_context(|| format!("Error creating {}", path.display()))
    };

    if hierarchical {
        let outcome = plan_hierarchical(
            records,
            &HierarchyParams {
                max_per_group: args.shared.max_per_pool,
                ..HierarchyParams::default()
            },
            &params,
            &params,
            &config,
        )?;
        for excluded in &outcome.excluded {
            log::warn!(
                "excluded '{}' ({})",
                excluded.record.library_name,
                excluded.flag
            );
        }
        write_stage_csv(out("stage1_libraries.csv")?, &outcome.plan.stages[0])?;
        write_stage_csv(out("stage2_subpools.csv")?, &outcome.plan.stages[1])?;
        write_hierarchical_json(out("plan.json")?, &outcome.plan)?;
        log::info!(
            "{} libraries into {} sub-pools, {} pipetting steps",
            outcome.plan.total_libraries,
            outcome.plan.total_subpools,
            outcome.plan.total_pipetting_steps
        );
    } else {
        let plan = plan_single_stage(records, &params, &config)?;
        for excluded in &plan.excluded {
            log::warn!(
                "excluded '{}' ({})",
                excluded.record.library_name,
                excluded.flag
            );
        }
        let flagged = plan.libraries.iter().filter(|l| !l.flags.is_empty()).count();
        if flagged > 0 {
            log::warn!("{flagged} libraries carry constraint flags; review before pooling");
        }
        write_library_csv(out("libraries.csv")?, &plan.libraries)?;
        write_summary_csv(out("projects.csv")?, &plan.summaries)?;
        write_single_stage_json(out("plan.json")?, &plan)?;
        log::info!("{} libraries pooled", plan.libraries.len());
    }
    Ok(())
}

fn run_strategy(args: StrategyCmd) -> Result<()> {
    let records = load_records(&args.shared)?;
    let recommendation =
        strategy::select(&records, args.shared.max_per_pool, args.shared.min_groups)?;
    serde_json::to_writer_pretty(std::io::stdout(), &recommendation)?;
    println!();
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match Poolcalc::parse().subcmd {
        SubCommand::Plan(args) => run_plan(args),
        SubCommand::Strategy(args) => run_strategy(args),
    }
}
