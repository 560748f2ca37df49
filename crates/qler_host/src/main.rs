mod plot;
mod report;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use plot::{PlotFormat, PlotRenderer};
use qler_common::defaults::{GRID_POINTS, NUM_TRIALS};
use qler_core::sweep::linspace;
use qler_core::{
    ChannelRegistry, CodeCatalog, CurveRenderer, InitStateMode, NullRenderer, PolarSampling,
    QlerError, StateVectorSimulator, SweepConfig, SweepDriver,
};
use qler_io::register_code_files;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "qler", about = "Monte Carlo logical error rates for stabilizer codes")]
struct Cli {
    /// trace, debug, info, warn or error
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Worker threads for trial parallelism (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TrialArgs {
    /// Trials per (code, channel, strength) cell
    #[arg(long, default_value_t = NUM_TRIALS)]
    trials: usize,
    /// Logical input states: discrete (|0>/|1>) or continuous (Bloch sphere)
    #[arg(long, default_value = "discrete")]
    mode: InitStateMode,
    /// Draw continuous inputs uniformly over the sphere instead of uniform polar angle
    #[arg(long)]
    haar: bool,
    #[arg(long)]
    seed: Option<u64>,
    /// Additional code definitions to register
    #[arg(long = "code-file")]
    code_file: Vec<PathBuf>,
    /// Run trials on the calling thread only
    #[arg(long)]
    serial: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep channel strength for every (channel, code) pair and plot the curves
    Sweep {
        #[arg(
            long,
            value_delimiter = ',',
            default_value = "bit_flip_code,phase_flip_code,steane_code,five_qubit_code"
        )]
        codes: Vec<String>,
        #[arg(
            long,
            value_delimiter = ',',
            default_value = "amplitude damping,dephasing,bit flip,phase flip,depolarizing"
        )]
        channels: Vec<String>,
        /// Evenly spaced strengths from 0 to 1
        #[arg(long, default_value_t = GRID_POINTS)]
        points: usize,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        #[arg(long, value_enum, default_value_t = PlotFormat::Svg)]
        format: PlotFormat,
        /// Print the tables only
        #[arg(long)]
        no_plot: bool,
        #[command(flatten)]
        trial: TrialArgs,
    },
    /// Estimate a single logical error rate
    Estimate {
        #[arg(long)]
        code: String,
        #[arg(long)]
        channel: String,
        #[arg(long)]
        strength: f64,
        #[command(flatten)]
        trial: TrialArgs,
    },
    /// List available codes and channels
    List {
        #[arg(long = "code-file")]
        code_file: Vec<PathBuf>,
    },
}

fn init_logging(level: &str) {
    let log_level = match level {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();
}

/// Attaches the failing pipeline stage to an engine error.
fn staged(e: QlerError) -> anyhow::Error {
    let stage = e.stage();
    anyhow::Error::new(e).context(format!("{} failed", stage))
}

fn load_catalog(code_files: &[PathBuf]) -> Result<CodeCatalog> {
    let mut catalog = CodeCatalog::builtin();
    let ids = register_code_files(&mut catalog, code_files)?;
    for id in ids {
        info!(code = %id, "registered code from file");
    }
    Ok(catalog)
}

fn sweep_config(trial: &TrialArgs, grid: Vec<f64>) -> SweepConfig {
    let polar = if trial.haar {
        PolarSampling::UniformCosine
    } else {
        PolarSampling::UniformAngle
    };
    if trial.haar && trial.mode == InitStateMode::Discrete {
        warn!("--haar has no effect in discrete mode");
    }
    SweepConfig {
        mode: trial.mode,
        polar,
        num_trials: trial.trials,
        strength_grid: grid,
        seed: trial.seed,
        parallel: !trial.serial,
    }
}

fn run_sweep(
    codes: Vec<String>,
    channels: Vec<String>,
    points: usize,
    out_dir: PathBuf,
    format: PlotFormat,
    no_plot: bool,
    trial: TrialArgs,
) -> Result<()> {
    let catalog = load_catalog(&trial.code_file)?;
    let registry = ChannelRegistry::standard();
    let families = registry.select(channels.as_slice()).map_err(staged)?;
    let config = sweep_config(&trial, linspace(0.0, 1.0, points));

    let mut renderer: Box<dyn CurveRenderer> = if no_plot {
        Box::new(NullRenderer)
    } else {
        let removed = plot::clean_partials(&out_dir)?;
        if removed > 0 {
            warn!(removed, "removed partial plots from an earlier run");
        }
        Box::new(PlotRenderer::new(&out_dir, format)?)
    };

    println!(
        "Sweeping {} codes x {} channels x {} strengths, {} trials each ({} mode)",
        codes.len(),
        families.len(),
        config.strength_grid.len(),
        config.num_trials,
        config.mode
    );
    let sim = StateVectorSimulator::new();
    let driver = SweepDriver::new(&catalog, &sim, config);
    let start = Instant::now();
    let result = driver
        .run(codes.as_slice(), &families, renderer.as_mut())
        .map_err(staged)?;
    let seconds = start.elapsed().as_secs_f64();

    report::print_sweep(&result);
    let cells = result.points().count();
    println!("\nTime: {:.2} s ({} cells)", seconds, cells);
    Ok(())
}

fn run_estimate(code: String, channel: String, strength: f64, trial: TrialArgs) -> Result<()> {
    let catalog = load_catalog(&trial.code_file)?;
    let family = ChannelRegistry::standard().get(&channel).map_err(staged)?;
    family.channel(strength).map_err(staged)?;

    let sim = StateVectorSimulator::new();
    let driver = SweepDriver::new(&catalog, &sim, sweep_config(&trial, vec![strength]));
    let result = driver
        .run(&[code.as_str()], &[family], &mut NullRenderer)
        .map_err(staged)?;
    let point = result
        .points()
        .next()
        .context("estimate produced no result")?;
    report::print_point(point);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    match cli.command {
        Commands::Sweep {
            codes,
            channels,
            points,
            out_dir,
            format,
            no_plot,
            trial,
        } => {
            run_sweep(codes, channels, points, out_dir, format, no_plot, trial)?;
        }
        Commands::Estimate {
            code,
            channel,
            strength,
            trial,
        } => {
            run_estimate(code, channel, strength, trial)?;
        }
        Commands::List { code_file } => {
            let catalog = load_catalog(&code_file)?;
            let registry = ChannelRegistry::standard();
            report::print_catalog(&catalog, &registry.names());
        }
    }
    Ok(())
}
