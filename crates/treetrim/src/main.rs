mod jsonl;

use std::io::{self, BufWriter, Write as _};

use anyhow::{Context, bail};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use treetrim_errors::Renderer;
use treetrim_eval::calibration::{
    CalibrationPoint, DEFAULT_DELTA, Outcome, ThresholdStats, aggregate, calibrate,
    default_epsilons,
};
use treetrim_eval::{Pipeline, PipelineConfig, Sample};
use treetrim_prune::Engine;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(version, about = "Prune code completions down to the parts the model is sure of")]
struct Options {
    /// Log at debug level unless `RUST_LOG` is set.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the node count of a snippet, -1 when it does not parse.
    Nodes { code: String },
    /// Parse a file and print its tree.
    Tree { path: Utf8PathBuf },
    /// Evaluate samples and print one JSON record per line.
    Run {
        /// JSON lines of `{id, target, completion}`.
        #[arg(long)]
        samples: Utf8PathBuf,
        #[arg(long)]
        config: Option<Utf8PathBuf>,
        #[arg(long)]
        engine: Option<Engine>,
        #[arg(long)]
        max_holes: Option<usize>,
        #[arg(long = "threshold")]
        thresholds: Vec<f64>,
        #[arg(long)]
        search_limit: Option<u64>,
        #[arg(long)]
        min_target_nodes: Option<usize>,
        /// Evaluate whole completions instead of their first line.
        #[arg(long)]
        all_lines: bool,
    },
    /// Pick a threshold per error rate from `run` records.
    Calibrate {
        #[arg(long)]
        records: Utf8PathBuf,
        #[arg(long, default_value_t = DEFAULT_DELTA)]
        delta: f64,
        #[arg(long, value_delimiter = ',')]
        epsilons: Vec<f64>,
    },
}

#[derive(Serialize)]
struct Calibration {
    thresholds: Vec<ThresholdStats>,
    points: Vec<CalibrationPoint>,
}

fn main() -> anyhow::Result<()> {
    let options = Options::parse();
    init_logging(options.verbose);

    match options.command {
        Command::Nodes { code } => {
            println!("{}", treetrim_parse::get_num_nodes_from_code(&code));
            Ok(())
        }
        Command::Tree { path } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read `{path}`"))?;
            let parse = treetrim_parse::parse(&text);

            let renderer = Renderer::styled();
            for diagnostic in parse.diagnostics() {
                eprintln!("{}", diagnostic.render(&renderer, path.as_str(), &text));
            }
            if parse.has_errors() {
                bail!("`{path}` has {} syntax errors", parse.diagnostics().len());
            }

            match parse.tree() {
                Some(tree) => print!("{tree}"),
                None => println!("<empty>"),
            }
            Ok(())
        }
        Command::Run {
            samples,
            config,
            engine,
            max_holes,
            thresholds,
            search_limit,
            min_target_nodes,
            all_lines,
        } => {
            let mut config = match &config {
                Some(path) => {
                    let text = std::fs::read_to_string(path)
                        .with_context(|| format!("failed to read `{path}`"))?;
                    PipelineConfig::from_toml(&text)
                        .with_context(|| format!("invalid configuration `{path}`"))?
                }
                None => PipelineConfig::default(),
            };
            if let Some(engine) = engine {
                config.engine = engine;
            }
            if max_holes.is_some() {
                config.max_holes = max_holes;
            }
            if !thresholds.is_empty() {
                config.thresholds = thresholds;
            }
            if let Some(search_limit) = search_limit {
                config.search_limit = search_limit;
            }
            if let Some(min_target_nodes) = min_target_nodes {
                config.min_target_nodes = min_target_nodes;
            }
            if all_lines {
                config.first_line_only = false;
            }
            config.sort_thresholds().context("invalid thresholds")?;
            tracing::debug!(?config, "configuration");

            let samples = jsonl::read::<Sample>(&samples)?;
            let batch = Pipeline::new(config).run_batch(&samples);

            let mut out = BufWriter::new(io::stdout().lock());
            for record in &batch.records {
                serde_json::to_writer(&mut out, record)?;
                writeln!(out)?;
            }
            out.flush()?;

            eprintln!(
                "{} samples, {} records, {} skipped",
                samples.len(),
                batch.records.len(),
                batch.skipped.len()
            );
            Ok(())
        }
        Command::Calibrate { records, delta, epsilons } => {
            let outcomes = jsonl::read::<Outcome>(&records)?;
            let epsilons = if epsilons.is_empty() { default_epsilons() } else { epsilons };

            let thresholds = aggregate(outcomes);
            let points = calibrate(&thresholds, &epsilons, delta)?;

            let mut out = io::stdout().lock();
            serde_json::to_writer_pretty(&mut out, &Calibration { thresholds, points })?;
            writeln!(out)?;
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
