use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "haptimer-cli", version, about = "Haptimer CLI")]
struct Cli {
    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a live countdown and print its events as JSON lines
    Run(commands::run::RunArgs),
    /// Replay a countdown on a synthetic clock without waiting
    Simulate(commands::simulate::SimulateArgs),
    /// Haptic pattern catalog
    Pattern {
        #[command(subcommand)]
        action: commands::pattern::PatternAction,
    },
    /// Saved timers
    Preset {
        #[command(subcommand)]
        action: commands::preset::PresetAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("haptimer={level}")));

    // stdout carries JSON output only.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<(), Box<dyn std::error::Error>> = match cli.command {
        Commands::Run(args) => commands::run::run(args).map_err(Into::into),
        Commands::Simulate(args) => commands::simulate::run(args).map_err(Into::into),
        Commands::Pattern { action } => commands::pattern::run(action).map_err(Into::into),
        Commands::Preset { action } => commands::preset::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
