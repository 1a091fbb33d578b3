mod config;
mod output;
mod simulate;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::simulate::SimOptions;

pub fn bail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

#[derive(Parser)]
#[command(name = "crowdrank", version, about = "Adaptive pairwise judging engine — simulation harness")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run a synthetic judging session against a hidden ground truth
    Simulate(SimulateArgs),
    /// Create a default config file at ~/.config/crowdrank/config.toml
    Init,
}

#[derive(Parser)]
struct SimulateArgs {
    /// Number of items in the pool
    #[arg(long)]
    items: Option<usize>,

    /// Number of judges driving comparisons
    #[arg(long)]
    judges: Option<usize>,

    /// Stop after this many recorded decisions
    #[arg(long)]
    votes: Option<usize>,

    /// Fraction of judges that vote near-randomly
    #[arg(long)]
    noisy: Option<f64>,

    /// Probability a judge skips a comparison instead of voting
    #[arg(long)]
    skip_rate: Option<f64>,

    /// RNG seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Output JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Show engine activity during the run
    #[arg(short, long)]
    verbose: bool,

    /// Path to config file (default: ~/.config/crowdrank/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let path = config::create_default_config();
            println!("Created config at {}", path.display());
        }
        Commands::Simulate(args) => run_simulate(args),
    }
}

fn run_simulate(args: SimulateArgs) {
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = args.config.clone().unwrap_or_else(config::config_path);
    let file_config = config::load_config(&config_path);

    let opts = SimOptions {
        items: args.items.or(file_config.items).unwrap_or(20),
        judges: args.judges.or(file_config.judges).unwrap_or(5),
        votes: args.votes.or(file_config.votes).unwrap_or(200),
        noisy: args.noisy.or(file_config.noisy).unwrap_or(0.2),
        skip_rate: args.skip_rate.or(file_config.skip_rate).unwrap_or(0.05),
        seed: args
            .seed
            .or(file_config.seed)
            .unwrap_or_else(|| rand::random()),
    };

    if opts.items < 2 {
        bail("need at least two items to compare");
    }
    if opts.judges == 0 {
        bail("need at least one judge");
    }
    if !(0.0..=1.0).contains(&opts.noisy) {
        bail("--noisy must be between 0.0 and 1.0");
    }
    if !(0.0..=1.0).contains(&opts.skip_rate) {
        bail("--skip-rate must be between 0.0 and 1.0");
    }

    let report = simulate::run(&opts).unwrap_or_else(|e| bail(e));

    if args.json {
        output::print_json(&report);
    } else {
        output::print_table(&report);
    }
}
