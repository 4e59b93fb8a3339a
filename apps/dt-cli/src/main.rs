use clap::{Args, Parser, Subcommand, ValueEnum};
use dt_app::{
    AppResult, LoadedProject, RunOverrides, RunProgressEvent, RunStage, SetupResponse,
    graph_summary, load_project, log_summary, setup_with_progress, simulate_with_progress,
};
use dt_core::{CancelToken, SystemClock};
use dt_graph::ReconcileStrategy;
use dt_sim::SimSummary;
use dt_store::MemoryGraphStore;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "twinsim")]
#[command(about = "Digital twin graph reconciliation and telemetry simulation", long_about = None)]
struct Cli {
    /// Graph snapshot file (defaults to .twinsim/graph.json next to the config)
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the config, device table and model documents and check them
    Validate {
        /// Path to the run configuration YAML file
        config: PathBuf,
    },
    /// Upload models and reconcile the graph with the device table
    Setup {
        config: PathBuf,
        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Run telemetry ticks against an already set up graph
    Simulate {
        config: PathBuf,
        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Setup followed by simulate
    Run {
        config: PathBuf,
        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Print the twins and relationships in the graph snapshot
    Show {
        config: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Per-device record counts of the telemetry log
    LogSummary { config: PathBuf },
}

#[derive(Args)]
struct OverrideArgs {
    /// Number of ticks to simulate
    #[arg(long)]
    max_ticks: Option<u32>,
    /// Seconds between ticks
    #[arg(long)]
    interval: Option<u64>,
    /// Random seed for reproducible telemetry
    #[arg(long)]
    seed: Option<u64>,
    /// Reconciliation strategy
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Replace,
    Diff,
}

impl From<&OverrideArgs> for RunOverrides {
    fn from(args: &OverrideArgs) -> Self {
        RunOverrides {
            max_ticks: args.max_ticks,
            interval_s: args.interval,
            seed: args.seed,
            strategy: args.strategy.map(|s| match s {
                StrategyArg::Replace => ReconcileStrategy::Replace,
                StrategyArg::Diff => ReconcileStrategy::Diff,
            }),
        }
    }
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let snapshot = cli.snapshot.as_deref();

    match cli.command {
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Setup { config, overrides } => {
            cmd_setup(&config, snapshot, &RunOverrides::from(&overrides))
        }
        Commands::Simulate { config, overrides } => {
            cmd_simulate(&config, snapshot, &RunOverrides::from(&overrides))
        }
        Commands::Run { config, overrides } => {
            let overrides = RunOverrides::from(&overrides);
            cmd_setup(&config, snapshot, &overrides)?;
            cmd_simulate(&config, snapshot, &overrides)
        }
        Commands::Show { config, json } => cmd_show(&config, snapshot, json),
        Commands::LogSummary { config } => cmd_log_summary(&config),
    }
}

fn snapshot_path(config: &Path, snapshot: Option<&Path>) -> PathBuf {
    match snapshot {
        Some(path) => path.to_path_buf(),
        None => config
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(".twinsim")
            .join("graph.json"),
    }
}

/// Persist the graph, including partial work from a failed step.
fn save_snapshot(store: &MemoryGraphStore, path: &Path, step_failed: bool) -> AppResult<()> {
    store.save(path)?;
    if step_failed {
        warn!(path = %path.display(), "step failed; partial graph state saved");
    } else {
        info!(path = %path.display(), "saved graph snapshot");
    }
    Ok(())
}

fn cmd_validate(config: &Path) -> AppResult<()> {
    println!("Validating: {}", config.display());
    let project = load_project(config, &RunOverrides::default())?;
    println!(
        "✓ {} rows, {} models",
        project.rows.len(),
        project.models.len()
    );
    Ok(())
}

fn cmd_setup(config: &Path, snapshot: Option<&Path>, overrides: &RunOverrides) -> AppResult<()> {
    let project = load_project(config, overrides)?;
    let snapshot = snapshot_path(config, snapshot);
    let mut store = MemoryGraphStore::open(&snapshot)?;

    println!(
        "Setting up graph ({} strategy) from {}",
        project.config.reconcile.strategy,
        project.config.source.display()
    );
    let result = setup_with_progress(
        &project,
        &mut store,
        &CancelToken::new(),
        Some(&mut |event| render_cli_progress(&event)),
    );
    clear_progress_line();
    save_snapshot(&store, &snapshot, result.is_err())?;
    let response = result?;

    print_setup_summary(&response);
    Ok(())
}

fn cmd_simulate(config: &Path, snapshot: Option<&Path>, overrides: &RunOverrides) -> AppResult<()> {
    let project = load_project(config, overrides)?;
    let snapshot = snapshot_path(config, snapshot);
    let mut store = MemoryGraphStore::open(&snapshot)?;

    print_simulation_header(&project);
    let result = simulate_with_progress(
        &project,
        &mut store,
        &SystemClock,
        &CancelToken::new(),
        Some(&mut |event| render_cli_progress(&event)),
    );
    clear_progress_line();
    save_snapshot(&store, &snapshot, result.is_err())?;
    let summary = result?;

    print_simulation_summary(&summary);
    Ok(())
}

fn cmd_show(config: &Path, snapshot: Option<&Path>, json: bool) -> AppResult<()> {
    let snapshot = snapshot_path(config, snapshot);
    let store = MemoryGraphStore::open(&snapshot)?;
    let summary = graph_summary(&store)?;

    if json {
        let text = serde_json::to_string_pretty(&summary)?;
        println!("{text}");
        return Ok(());
    }

    if summary.twins.is_empty() {
        println!("Graph is empty ({})", snapshot.display());
        return Ok(());
    }
    println!("Twins:");
    for twin in &summary.twins {
        let properties = serde_json::Value::Object(twin.properties.clone());
        println!("  {} [{}] {}", twin.id, twin.model_id, properties);
    }
    println!("Relationships:");
    for rel in &summary.relationships {
        println!("  {}: {} --{}--> {}", rel.id, rel.source, rel.name, rel.target);
    }
    Ok(())
}

fn cmd_log_summary(config: &Path) -> AppResult<()> {
    let config = dt_project::load_config(config)?;
    let summary = log_summary(&config.telemetry_log)?;

    if summary.records == 0 {
        println!("No telemetry in {}", config.telemetry_log.display());
        return Ok(());
    }
    println!("Telemetry log: {}", config.telemetry_log.display());
    println!("  Records: {}", summary.records);
    if let (Some(first), Some(last)) = (&summary.first, &summary.last) {
        println!("  From {first} to {last}");
    }
    for (device, count) in &summary.devices {
        println!("  {device}: {count}");
    }
    Ok(())
}

fn print_setup_summary(response: &SetupResponse) {
    let reconcile = &response.reconcile;
    println!("✓ Setup completed");
    println!(
        "  Models: {} deleted, {} created",
        response.models.deleted, response.models.created
    );
    println!(
        "  Twins: {} deleted, {} created",
        reconcile.twins_deleted(),
        reconcile.twins_created()
    );
    println!(
        "  Relationships: {} deleted, {} created",
        reconcile.relationships_deleted(),
        reconcile.relationships_created()
    );
    for (phase, failure) in reconcile.failures() {
        println!("  ✗ {phase}: {failure}");
    }
    if !response.verify.is_consistent() {
        println!("  ! Graph does not match the device table");
        for id in &response.verify.missing_twins {
            println!("    missing twin {id}");
        }
        for id in &response.verify.missing_relationships {
            println!("    missing relationship {id}");
        }
    }
}

fn print_simulation_header(project: &LoadedProject) {
    let sim = &project.config.simulation;
    println!(
        "Simulating {} ticks every {} s ({} rows)",
        sim.max_ticks,
        sim.interval_s,
        project.rows.len()
    );
}

fn print_simulation_summary(summary: &SimSummary) {
    if summary.cancelled {
        println!("! Simulation cancelled after {} ticks", summary.ticks_run);
    } else {
        println!("✓ Simulation completed: {} ticks", summary.ticks_run);
    }
    println!("  Records logged: {}", summary.records_logged);
    println!("  Twins updated:  {}", summary.published);
    if summary.skipped_rows > 0 {
        println!("  Rows skipped (malformed init data): {}", summary.skipped_rows);
    }
    if summary.unknown_keys > 0 {
        println!("  Keys without a generation rule: {}", summary.unknown_keys);
    }
    for failure in &summary.publish_failures {
        println!("  ✗ {failure}");
    }
    println!("  Elapsed: {:.1}s", summary.elapsed_wall_s);
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    let mut line = match (&event.stage, &event.tick) {
        (RunStage::Simulating, Some(tick)) => {
            let width = 28usize;
            let filled = ((tick.fraction_complete() * width as f64).round() as usize).min(width);
            format!(
                "\r[{}{}] tick {}/{}  {}  published={}  failed={}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled)),
                tick.tick,
                tick.max_ticks,
                tick.timestamp.format("%Y-%m-%d %H:%M:%S"),
                tick.publish.published.len(),
                tick.publish.failed.len()
            )
        }
        _ => format!("\r{}", event.stage.label()),
    };
    line.push_str(&format!("  elapsed={:.1}s", event.elapsed_wall_s));
    if event.tick.is_none()
        && let Some(msg) = &event.message
    {
        line.push_str(&format!("  {msg}"));
    }
    print!("{line}");
    let _ = io::stdout().flush();
}
