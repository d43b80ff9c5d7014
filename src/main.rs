//! pdep CLI - two-way partial dependence surfaces
//!
//! Command-line entry point. Loads a delimited dataset, sweeps two of its
//! columns through the configured batch scorer, and emits the resulting
//! surface:
//!
//! 1. Config: `pdep.toml` (nearest ancestor) or `--config`, then CLI overrides
//! 2. Dataset: delimited text with a header row
//! 3. Surface: grids, sampling, expansion, scoring, aggregation
//! 4. Output: PNG plot, data URI, CSV, JSON, or a terminal table
//!
//! An existing plot at the output path is reused unless `--refresh` is given,
//! so repeated requests for the same pair do not rescore.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pdep::config::Config;
use pdep::dataset::read_delimited_path;
use pdep::pipeline::PartialDependence;
use pdep::rendering::{TableRenderer, embed_png, plot_file_name};
use pdep::scoring::BatchScorer;
use pdep::sweep::GridPolicy;
use pdep::types::{TargetDescriptor, TargetKind};

/// Two-way partial dependence surfaces for remotely scored models
///
/// pdep shows how a model's prediction moves as two input columns are
/// swept over representative values while every other column keeps real,
/// sampled values.
///
/// Examples:
///   pdep data.csv --list-columns
///   pdep data.csv --col-a price --col-b competitor_price --target churn --kind binary
///   pdep data.csv --col-a age --col-b income --target spend --out plots/
///   pdep data.csv --col-a age --col-b income --target spend --json --seed 42
#[derive(Parser, Debug)]
#[command(name = "pdep")]
#[command(version)]
#[command(about, long_about = None)]
pub struct Cli {
    /// Dataset to sample base rows from (delimited text with a header row)
    #[arg(value_name = "DATA")]
    pub data: PathBuf,

    /// First swept column
    #[arg(long = "col-a", value_name = "COLUMN")]
    pub col_a: Option<String>,

    /// Second swept column
    #[arg(long = "col-b", value_name = "COLUMN")]
    pub col_b: Option<String>,

    /// Name of the model's target column
    #[arg(short, long)]
    pub target: Option<String>,

    /// Target kind
    ///
    /// binary averages the positive-class probability; regression averages
    /// the point estimate.
    #[arg(short, long, default_value = "regression", value_parser = ["binary", "regression"])]
    pub kind: String,

    /// Write the surface plot as PNG
    ///
    /// A directory gets the canonical file name
    /// `<project>-<model>-<col-a>-<col-b>.png`. An existing file is reused
    /// unless --refresh is given.
    #[arg(short, long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Print the plot as a data:image/png;base64 URI
    #[arg(long)]
    pub embed: bool,

    /// Write the surface as CSV
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Print the surface as JSON
    #[arg(long)]
    pub json: bool,

    /// Pin the sampling seed
    ///
    /// Without it a fresh seed is drawn per run; the seed used is logged
    /// and recorded in the JSON output.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Total synthetic rows to aim for
    #[arg(long, value_name = "ROWS")]
    pub row_ceiling: Option<usize>,

    /// Reduction for columns with more than 25 distinct values
    ///
    ///   even-width  21 evenly spaced points from min to max (numeric only)
    ///   truncate    first 25 distinct values seen
    #[arg(long, value_name = "POLICY")]
    pub grid_policy: Option<GridPolicy>,

    /// Scoring timeout in seconds (0 waits indefinitely)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Config file (default: nearest pdep.toml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Field delimiter of the dataset
    #[arg(short, long, default_value = ",")]
    pub delimiter: char,

    /// Recompute even when the output plot already exists
    #[arg(long)]
    pub refresh: bool,

    /// List the columns usable as sweep axes and exit
    #[arg(long)]
    pub list_columns: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Verbose output
    ///
    /// Shows the resolved configuration and pipeline progress. RUST_LOG
    /// overrides the log filter.
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(output) = run(&cli)? {
        print!("{}", output);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "pdep=info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => {
            let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
            Config::load(&cwd)
        }
    };

    let surface = &mut config.surface;
    if let Some(seed) = cli.seed {
        surface.random_seed = Some(seed);
    }
    if let Some(ceiling) = cli.row_ceiling {
        surface.row_ceiling = ceiling;
    }
    if let Some(policy) = cli.grid_policy {
        surface.grid_policy = policy;
    }
    if let Some(secs) = cli.timeout {
        surface.scoring_timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }
    surface.validate()?;

    Ok(config)
}

/// Resolve `--out`: directories get the canonical plot name.
fn plot_path(out: &Path, config: &Config, col_a: &str, col_b: &str) -> PathBuf {
    if out.is_dir() {
        out.join(plot_file_name(
            &config.scorer.project_id,
            &config.scorer.model_id,
            col_a,
            col_b,
        ))
    } else {
        out.to_path_buf()
    }
}

fn run(cli: &Cli) -> Result<Option<String>> {
    let config = load_config(cli)?;
    if cli.verbose {
        eprintln!("📈 pdep v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("{}", config.display_summary());
    }

    let dataset = read_delimited_path(&cli.data, cli.delimiter)?;
    if cli.verbose {
        eprintln!(
            "📂 Loaded {} rows x {} columns from {}",
            dataset.len(),
            dataset.columns().len(),
            cli.data.display()
        );
    }

    if cli.list_columns {
        let mut out = String::new();
        for name in dataset.numeric_columns() {
            out.push_str(name);
            out.push('\n');
        }
        return Ok(Some(out));
    }

    let (Some(col_a), Some(col_b), Some(target)) = (&cli.col_a, &cli.col_b, &cli.target) else {
        bail!("--col-a, --col-b and --target are required (or use --list-columns)");
    };
    let target = TargetDescriptor::new(target, TargetKind::from_project_type(&cli.kind));

    let png_path = cli.out.as_deref().map(|o| plot_path(o, &config, col_a, col_b));
    if let Some(path) = &png_path {
        if path.exists() && !cli.refresh && cli.csv.is_none() && !cli.json {
            eprintln!("✓ Reusing existing plot {} (use --refresh to recompute)", path.display());
            if cli.embed {
                let png = std::fs::read(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                return Ok(Some(format!("{}\n", embed_png(&png))));
            }
            return Ok(None);
        }
    }

    let scorer = BatchScorer::new(config.scorer.clone())?;
    let pd = PartialDependence::new(config.surface.clone(), Arc::new(scorer));

    if cli.verbose {
        eprintln!("🔁 Sweeping {} x {} for {} ({})", col_a, col_b, target.name, target.kind);
    }

    let mut output = String::new();
    let surface = match (&png_path, cli.embed) {
        (Some(path), embed) => {
            let surface = pd.render_to_file(&dataset, &target, col_a, col_b, path)?;
            eprintln!("✓ Wrote {}", path.display());
            if embed {
                let png = std::fs::read(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                output.push_str(&embed_png(&png));
                output.push('\n');
            }
            surface
        }
        (None, true) => {
            let embedded = pd.render_embedded(&dataset, &target, col_a, col_b)?;
            output.push_str(&embedded.data_uri);
            output.push('\n');
            embedded.surface
        }
        (None, false) => pd.compute(&dataset, &target, col_a, col_b)?,
    };

    if let Some(csv_path) = &cli.csv {
        let file = File::create(csv_path)
            .with_context(|| format!("Failed to create {}", csv_path.display()))?;
        surface
            .to_csv(file)
            .with_context(|| format!("Failed to write {}", csv_path.display()))?;
        eprintln!("✓ Wrote {}", csv_path.display());
    }

    if cli.json {
        output.push_str(&surface.to_json()?);
        output.push('\n');
    }

    if png_path.is_none() && !cli.embed && cli.csv.is_none() && !cli.json {
        output.push_str(&TableRenderer::new(!cli.no_color).render(&surface));
    }

    Ok(Some(output))
}
