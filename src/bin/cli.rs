//! plotgroup CLI - Debug tool for plot grouping
//!
//! Usage:
//!   plotgroup-cli group <request.json> [--output <file>] [--threshold <m>] ...
//!   plotgroup-cli buckets <request.json> [--tolerance-days <n>]
//!
//! Reads a JSON grouping request (plots, optional parameter overrides,
//! supervisors and naming context), runs the grouping engine and prints
//! verbose output of how plots were bucketed, grouped and rejected.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use plotgroup::{
    AssignmentPlan, GroupingOutcome, GroupingOverrides, NamingContext, PlotCandidate,
    SeasonalGroupNamer, SupervisorCandidate, form_groups, name_groups, partition_compatible,
    plan_supervisors, prepare_plots,
};

#[derive(Parser)]
#[command(name = "plotgroup-cli")]
#[command(about = "Debug tool for plot grouping", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Form groups and propose supervisors
    Group {
        /// JSON grouping request
        input: PathBuf,

        /// Write the full result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Show compatibility buckets without clustering
    Buckets {
        /// JSON grouping request
        input: PathBuf,

        #[command(flatten)]
        overrides: OverrideArgs,
    },
}

/// Parameter flags. Each one, when given, wins over the request file.
#[derive(Args, Default)]
struct OverrideArgs {
    /// Proximity threshold in meters
    #[arg(long)]
    threshold: Option<f64>,

    /// Planting date tolerance in days
    #[arg(long)]
    tolerance_days: Option<u32>,

    /// Minimum group area in hectares
    #[arg(long)]
    min_area: Option<f64>,

    /// Maximum group area in hectares
    #[arg(long)]
    max_area: Option<f64>,

    /// Minimum plots per group
    #[arg(long)]
    min_plots: Option<usize>,

    /// Maximum plots per group
    #[arg(long)]
    max_plots: Option<usize>,

    /// Date used for plots without a planting date (YYYY-MM-DD)
    #[arg(long)]
    reference_date: Option<NaiveDate>,
}

impl OverrideArgs {
    fn merge_into(&self, file: &GroupingOverrides) -> GroupingOverrides {
        GroupingOverrides {
            proximity_threshold_meters: self.threshold.or(file.proximity_threshold_meters),
            planting_date_tolerance_days: self
                .tolerance_days
                .or(file.planting_date_tolerance_days),
            min_group_area_ha: self.min_area.or(file.min_group_area_ha),
            max_group_area_ha: self.max_area.or(file.max_group_area_ha),
            min_plots_per_group: self.min_plots.or(file.min_plots_per_group),
            max_plots_per_group: self.max_plots.or(file.max_plots_per_group),
            reference_date: self.reference_date.or(file.reference_date),
        }
    }
}

/// Grouping request loaded from disk
#[derive(Deserialize)]
struct GroupingRequest {
    plots: Vec<PlotCandidate>,
    #[serde(default)]
    parameters: GroupingOverrides,
    #[serde(default)]
    supervisors: Vec<SupervisorCandidate>,
    #[serde(default)]
    cluster_id: Option<String>,
    #[serde(default)]
    naming: Option<NamingContext>,
}

/// Full result written with `--output`
#[derive(Serialize)]
struct GroupingReport<'a> {
    outcome: &'a GroupingOutcome,
    assignments: &'a AssignmentPlan,
    names: BTreeMap<u32, String>,
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Group {
            input,
            output,
            overrides,
        } => run_group(&input, output.as_deref(), &overrides, cli.verbose),
        Commands::Buckets { input, overrides } => run_buckets(&input, &overrides, cli.verbose),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Load a grouping request from a JSON file
fn load_request(path: &Path) -> Result<GroupingRequest, String> {
    println!("\n{}", "=".repeat(60));
    println!("Loading request from: {}", path.display());
    println!("{}", "=".repeat(60));

    let file = File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let request: GroupingRequest = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| format!("{}: {}", path.display(), e))?;

    println!(
        "Loaded {} plots, {} supervisors",
        request.plots.len(),
        request.supervisors.len()
    );
    Ok(request)
}

/// Run grouping and supervisor planning
fn run_group(
    input: &Path,
    output: Option<&Path>,
    overrides: &OverrideArgs,
    verbose: bool,
) -> Result<(), String> {
    let request = load_request(input)?;
    let params = overrides.merge_into(&request.parameters).resolve();

    println!("\n{}", "=".repeat(60));
    println!("PLOT GROUPING");
    println!("{}", "=".repeat(60));
    println!(
        "  threshold {:.0}m, tolerance {}d, area {:.1}-{:.1}ha, plots {}-{}",
        params.proximity_threshold_meters,
        params.planting_date_tolerance_days,
        params.min_group_area_ha,
        params.max_group_area_ha,
        params.min_plots_per_group,
        params.max_plots_per_group
    );

    let outcome = form_groups(&request.plots, &params).map_err(|e| e.to_string())?;
    let assignments = plan_supervisors(
        &outcome.groups,
        &request.supervisors,
        request.cluster_id.as_deref(),
    );
    let names: BTreeMap<u32, String> = request
        .naming
        .as_ref()
        .map(|ctx| name_groups(&SeasonalGroupNamer, ctx, &outcome.groups))
        .unwrap_or_default()
        .into_iter()
        .collect();

    println!("\n[Groups] {}", outcome.groups.len());
    for group in &outcome.groups {
        let label = names
            .get(&group.group_number)
            .cloned()
            .unwrap_or_else(|| format!("#{}", group.group_number));
        println!(
            "  {} - {} plots, {:.2}ha, {} {}..{} (median {}), supervisor {}",
            label,
            group.plot_count(),
            group.total_area_ha,
            group.rice_variety_id,
            group.planting_window_start,
            group.planting_window_end,
            group.median_planting_date,
            assignments
                .supervisor_for(group.group_number)
                .unwrap_or("-")
        );
        if verbose {
            println!("    plots: {}", group.plot_ids.join(", "));
            println!("    farmers: {}", group.farmer_ids.join(", "));
        }
    }

    println!("\n[Ungrouped] {}", outcome.ungrouped.len());
    for info in &outcome.ungrouped {
        let nearest = match (info.nearest_group_number, info.distance_to_nearest_group_m) {
            (Some(n), Some(d)) => format!("nearest #{} at {:.0}m", n, d),
            _ => "no group nearby".to_string(),
        };
        println!(
            "  {} ({:.2}ha) - {} ({})",
            info.plot_id, info.area_ha, info.reason, nearest
        );
        if verbose {
            for suggestion in &info.suggestions {
                println!("    - {}", suggestion);
            }
        }
    }

    if assignments.insufficient_supervisors {
        println!("\n[WARN] No available supervisors, groups left unassigned");
    } else if verbose {
        println!("\n[Workloads]");
        for w in &assignments.workloads {
            println!(
                "  {} - {} groups, {:.1}ha -> {:.1}ha",
                w.supervisor_id,
                w.assigned_groups,
                w.current_area_ha,
                w.projected_area_ha()
            );
        }
    }

    let stats = &outcome.stats;
    println!(
        "\nStats: {} plots, {} buckets, {} components, {} merges ({} incoherent), {} splits",
        stats.input_plots,
        stats.buckets,
        stats.components,
        stats.merges_accepted,
        stats.merges_rejected_incoherent,
        stats.splits
    );

    if let Some(path) = output {
        let report = GroupingReport {
            outcome: &outcome,
            assignments: &assignments,
            names,
        };
        write_json(path, &report)?;
        println!("\nWrote result to: {}", path.display());
    }

    Ok(())
}

/// Show how plots fall into compatibility buckets
fn run_buckets(input: &Path, overrides: &OverrideArgs, verbose: bool) -> Result<(), String> {
    let request = load_request(input)?;
    let params = overrides.merge_into(&request.parameters).resolve();
    let run = prepare_plots(&request.plots, &params).map_err(|e| e.to_string())?;
    let buckets = partition_compatible(&run.placed, params.planting_date_tolerance_days);

    println!("\n{}", "=".repeat(60));
    println!("COMPATIBILITY BUCKETS (tolerance {}d)", params.planting_date_tolerance_days);
    println!("{}", "=".repeat(60));

    for (i, bucket) in buckets.iter().enumerate() {
        let area: f64 = bucket.plots.iter().map(|p| p.plot.area_ha).sum();
        println!(
            "  [{}] {} {}..{} ({}d) - {} plots, {:.2}ha",
            i,
            bucket.rice_variety_id,
            bucket.window_start,
            bucket.window_end,
            bucket.span_days(),
            bucket.len(),
            area
        );
        if verbose {
            for p in &bucket.plots {
                println!(
                    "    {} {} ({:.0}, {:.0})",
                    p.plot.plot_id, p.planting_date, p.position[0], p.position[1]
                );
            }
        }
    }

    if !run.unplaceable.is_empty() {
        println!("\n[Unplaceable] {}", run.unplaceable.len());
        for plot in &run.unplaceable {
            println!("  {}", plot.plot_id);
        }
    }

    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let file = File::create(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| e.to_string())?;
    writer.flush().map_err(|e| e.to_string())
}
