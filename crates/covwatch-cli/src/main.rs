//! covwatch — continuous code coverage for a solution tree.
//!
//! ## Commands
//!
//! - `watch`: watch compiled test assemblies and regenerate coverage on change
//! - `generate`: run the coverage pipeline once and exit

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use covwatch_core::pipeline::DEFAULT_OUTPUT_DIR;
use covwatch_core::{
    resolve_output_dirs, solution, trigger_channel, CoveragePipeline, PipelineWorker, RunLayout,
    ToolSettings, WatchCoordinator, WatchGate,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "covwatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Continuous code coverage for a multi-project build tree", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Solution directory containing the projects to cover
    #[arg(short, long)]
    target_dir: PathBuf,

    /// Directory receiving coverage.xml and the generated report
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Build configuration selecting the bin/<config> output
    #[arg(short, long, default_value = "Local")]
    build_config: String,

    /// Settings file naming the external tool executables
    #[arg(short, long, default_value = "covwatch.toml", env = "COVWATCH_CONFIG")]
    config: PathBuf,

    /// Include every project, not only ones whose name contains "test"
    #[arg(long)]
    all_projects: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch compiled test assemblies and regenerate coverage on change
    Watch {
        #[command(flatten)]
        args: RunArgs,
    },

    /// Run the coverage pipeline once and exit
    Generate {
        #[command(flatten)]
        args: RunArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    covwatch_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Watch { args } => cmd_watch(args).await,
        Commands::Generate { args } => cmd_generate(args).await,
    }
}

/// Validate settings and resolve the watched output directories.
fn setup(args: &RunArgs) -> Result<(ToolSettings, BTreeMap<String, PathBuf>)> {
    let settings = ToolSettings::load(&args.config)
        .with_context(|| format!("loading settings from {}", args.config.display()))?;

    let projects = select_projects(&args.target_dir, args.all_projects)?;
    let output_dirs = resolve_output_dirs(&projects, &args.build_config)
        .context("resolving build output directories")?;
    if output_dirs.is_empty() {
        bail!(
            "no '{}' build output found under {}",
            args.build_config,
            args.target_dir.display()
        );
    }

    Ok((settings, output_dirs))
}

fn select_projects(target_dir: &Path, all_projects: bool) -> Result<Vec<PathBuf>> {
    if !solution::is_solution_dir(target_dir) {
        bail!("{} is not a solution directory", target_dir.display());
    }

    let mut projects = solution::project_directories(target_dir);
    if !all_projects {
        projects.retain(|p| solution::looks_like_test_project(p));
    }
    if projects.is_empty() {
        bail!(
            "no project directories selected under {} (try --all-projects)",
            target_dir.display()
        );
    }

    Ok(projects)
}

fn layout_for(args: &RunArgs) -> RunLayout {
    RunLayout {
        output_dir: args.output_dir.clone(),
        ..RunLayout::default()
    }
}

async fn cmd_watch(args: RunArgs) -> Result<()> {
    let (settings, output_dirs) = setup(&args)?;

    let gate = WatchGate::new();
    let pipeline = Arc::new(CoveragePipeline::new(
        settings,
        layout_for(&args),
        Arc::clone(&gate),
    ));

    let (trigger, triggers) = trigger_channel();
    let coordinator = WatchCoordinator::start(&output_dirs, gate, trigger)
        .context("starting filesystem watches")?;

    for (dir, file) in coordinator.watched() {
        info!(dir = %dir.display(), file, "watching build output");
    }
    info!(
        watches = coordinator.len(),
        build_config = %args.build_config,
        "watching for assembly changes, Ctrl-C to stop"
    );

    let worker = PipelineWorker::spawn(pipeline, output_dirs, triggers);

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    info!("shutting down");
    // Stop watching first; an in-flight run finishes during worker shutdown.
    coordinator.stop();
    worker.shutdown().await;

    Ok(())
}

async fn cmd_generate(args: RunArgs) -> Result<()> {
    let (settings, output_dirs) = setup(&args)?;

    let gate = WatchGate::new();
    let pipeline = CoveragePipeline::new(settings, layout_for(&args), gate);

    let result = pipeline
        .run(&output_dirs)
        .await
        .context("coverage run failed")?;

    println!("Run {} finished in {}ms", result.run_id, result.duration_ms);
    println!(
        "Staged {} files, {} test assemblies",
        result.staged_files,
        result.test_assemblies.len()
    );
    for tool in &result.tools {
        println!("--- {} ({}ms)", tool.tool, tool.duration_ms);
        if !tool.stdout.is_empty() {
            println!("{}", tool.stdout.trim_end());
        }
    }
    println!("Report written to {}", args.output_dir.display());

    Ok(())
}
