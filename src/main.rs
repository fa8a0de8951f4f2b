//! DAU Scenario - scenario recalculation & weekly trend charts
//!
//! Loads the DAU model workbook, applies the scenario drivers and charts or prints the result.

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use dau_scenario::charts::StaticChartRenderer;
use dau_scenario::config::ScenarioConfig;
use dau_scenario::data::{DataProcessor, Sheet, Workbook};
use dau_scenario::scenario::{ScenarioDrivers, ScenarioEngine};
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "DAU model scenario explorer", long_about = None)]
struct Cli {
    /// JSON config file; command line flags override its values
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recalculate a scenario and render the selected metrics as a chart
    Chart(ChartArgs),
    /// Recalculate a scenario and print or export the derived table
    Table(TableArgs),
    /// Evaluate every configured scenario and print metric totals
    Sweep(SweepArgs),
}

#[derive(Args, Debug)]
struct ScenarioArgs {
    /// Workbook directory holding Basedata.csv and DAU_Model_imapct.csv
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    workbook: Option<PathBuf>,

    /// Sheet to recalculate: `basedata` or `model`
    #[arg(long)]
    sheet: Option<Sheet>,

    /// Scale weekly installs by this factor (0.5 to 1.5)
    #[arg(long, allow_hyphen_values = true)]
    install_multiplier: Option<f64>,

    /// Fractional change to all retention rates (-0.25 to 0.25)
    #[arg(long, allow_hyphen_values = true)]
    retention_delta: Option<f64>,

    /// Fractional change to engagement % (-0.25 to 0.25)
    #[arg(long, allow_hyphen_values = true)]
    engagement_delta: Option<f64>,
}

impl ScenarioArgs {
    fn apply(&self, config: &mut ScenarioConfig) {
        if let Some(workbook) = &self.workbook {
            config.workbook = Some(workbook.clone());
        }
        if let Some(sheet) = self.sheet {
            config.sheet = sheet;
        }

        let drivers: &mut ScenarioDrivers = &mut config.drivers;
        if let Some(v) = self.install_multiplier {
            drivers.install_multiplier = v;
        }
        if let Some(v) = self.retention_delta {
            drivers.retention_delta = v;
        }
        if let Some(v) = self.engagement_delta {
            drivers.engagement_delta = v;
        }
    }
}

#[derive(Args, Debug)]
struct ChartArgs {
    #[command(flatten)]
    scenario: ScenarioArgs,

    /// Metrics to plot, comma separated; later ones are drawn over earlier ones
    #[arg(short, long, value_delimiter = ',')]
    metrics: Vec<String>,

    /// Output image path (`.svg` for SVG, otherwise PNG)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    #[arg(long)]
    title: Option<String>,
}

#[derive(Args, Debug)]
struct TableArgs {
    #[command(flatten)]
    scenario: ScenarioArgs,

    /// Number of rows to print
    #[arg(long, default_value_t = 20)]
    rows: usize,

    /// Write the full derived table as CSV instead (`-` for stdout)
    #[arg(long, value_hint = ValueHint::FilePath)]
    csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SweepArgs {
    #[command(flatten)]
    scenario: ScenarioArgs,

    /// Metrics to total, comma separated
    #[arg(short, long, value_delimiter = ',')]
    metrics: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = match &cli.config {
        Some(path) => ScenarioConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ScenarioConfig::default(),
    };

    match cli.command {
        Command::Chart(args) => handle_chart(config, args),
        Command::Table(args) => handle_table(config, args),
        Command::Sweep(args) => handle_sweep(config, args),
    }
}

fn load_base(config: &ScenarioConfig) -> Result<DataFrame> {
    let Some(dir) = &config.workbook else {
        bail!("no workbook given (use --workbook or the `workbook` config field)");
    };
    let workbook =
        Workbook::open(dir).with_context(|| format!("loading workbook {}", dir.display()))?;
    Ok(workbook.sheet(config.sheet).clone())
}

fn recalculate(config: &ScenarioConfig, base: &DataFrame) -> Result<DataFrame> {
    if config.drivers.is_identity() {
        info!("identity drivers; derived columns repeat their sources");
    }
    let derived = ScenarioEngine::recalculate(base, &config.drivers)
        .with_context(|| format!("recalculating sheet {}", config.sheet))?;

    let columns = derived.get_column_names();
    let present: Vec<&str> = ScenarioEngine::derived_column_names()
        .into_iter()
        .filter(|name| columns.iter().any(|c| c.as_str() == *name))
        .collect();
    info!(sheet = %config.sheet, derived = ?present, "recalculated scenario");
    Ok(derived)
}

fn handle_chart(mut config: ScenarioConfig, args: ChartArgs) -> Result<()> {
    args.scenario.apply(&mut config);
    if !args.metrics.is_empty() {
        config.metrics = args.metrics;
    }
    if let Some(output) = args.output {
        config.output = output;
    }
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(title) = args.title {
        config.title = title;
    }
    let config = config.validate()?;

    let base = load_base(&config)?;
    let derived = recalculate(&config, &base)?;

    let metrics = if config.metrics.is_empty() {
        DataProcessor::default_metrics(&derived)
    } else {
        config.metrics.clone()
    };
    info!(drivers = %config.drivers, metrics = ?metrics, "charting scenario");

    StaticChartRenderer::render(&derived, &metrics, &config.output, &config.chart_options())
        .context("rendering chart")?;
    println!("{}", config.output.display());
    Ok(())
}

fn handle_table(mut config: ScenarioConfig, args: TableArgs) -> Result<()> {
    args.scenario.apply(&mut config);
    let config = config.validate()?;

    let base = load_base(&config)?;
    let mut derived = recalculate(&config, &base)?;

    match args.csv {
        Some(path) if path.as_os_str() == "-" => {
            CsvWriter::new(io::stdout().lock()).finish(&mut derived)?;
        }
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            CsvWriter::new(file).finish(&mut derived)?;
            info!(path = %path.display(), rows = derived.height(), "wrote derived table");
        }
        None => {
            println!("{}", DataProcessor::preview(&derived, args.rows));
        }
    }
    Ok(())
}

fn handle_sweep(mut config: ScenarioConfig, args: SweepArgs) -> Result<()> {
    args.scenario.apply(&mut config);
    if !args.metrics.is_empty() {
        config.metrics = args.metrics;
    }
    let config = config.validate()?;

    let base = load_base(&config)?;
    let scenarios = config.sweep_scenarios();
    let drivers: Vec<ScenarioDrivers> = scenarios.iter().map(|s| s.drivers).collect();
    let results = ScenarioEngine::recalculate_many(&base, &drivers)?;

    for (scenario, derived) in scenarios.iter().zip(&results) {
        let metrics = if config.metrics.is_empty() {
            DataProcessor::default_metrics(derived)
        } else {
            config.metrics.clone()
        };
        let totals = DataProcessor::metric_totals(derived, &metrics)
            .with_context(|| format!("summarizing scenario {}", scenario.name))?;

        let summary: Vec<String> = totals
            .iter()
            .map(|(metric, total)| format!("{metric}={total:.2}"))
            .collect();
        println!(
            "{}\t[{}]\t{}",
            scenario.name,
            scenario.drivers,
            summary.join("  ")
        );
    }
    Ok(())
}
