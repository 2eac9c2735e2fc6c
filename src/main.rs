use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use noisy_buildings_semseg::config::HarnessConfig;
use noisy_buildings_semseg::noise::NoiseType;

#[derive(Parser)]
#[command(name = "noisy-buildings-semseg")]
#[command(about = "Measure how label noise degrades building segmentation accuracy")]
struct Cli {
    /// Read rasters and labels from the remote data root instead of local copies
    #[arg(long, global = true)]
    use_remote_data: bool,

    /// Run against the reduced test configuration (tiny splits, short training)
    #[arg(long, global = true)]
    test: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate noisy copies of the building labels for every noise level
    Synth,

    /// Write experiment configurations for one noise family
    Experiments {
        /// Noise family to declare experiments for
        #[arg(long, value_enum, default_value_t = NoiseType::Drop)]
        noise_type: NoiseType,
    },

    /// Compute label confusion statistics across all noise levels
    Analyze,

    /// Plot per-family accuracy curves from evaluation output
    PlotCurves,

    /// Plot the combined F1 chart and label transition probabilities
    PlotCombined,

    /// Render scene montages of noisy labels and predictions
    PlotImages,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .ok();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = HarnessConfig::new(cli.use_remote_data, cli.test);

    match cli.command {
        Commands::Synth => noisy_buildings_semseg::noise::run_synth(&config),
        Commands::Experiments { noise_type } => {
            noisy_buildings_semseg::experiment::run_experiments(&config, noise_type)
        }
        Commands::Analyze => noisy_buildings_semseg::metrics::run_analyze(&config),
        Commands::PlotCurves => noisy_buildings_semseg::plot::curves::run_plot_curves(&config),
        Commands::PlotCombined => {
            noisy_buildings_semseg::plot::combined::run_plot_combined(&config)
        }
        Commands::PlotImages => noisy_buildings_semseg::plot::images::run_plot_images(&config),
    }
}
