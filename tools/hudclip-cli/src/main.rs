//! HudClip CLI — Command-line interface for cutting gameplay highlights.
//!
//! Usage:
//!   hudclip render <INPUT> --start <T> --end <T>   Render a highlight clip
//!   hudclip plan <INPUT> --start <T> --end <T>     Show the encode plan without running it
//!   hudclip probe <INPUT>                          Show source information
//!   hudclip check                                  Check encoder availability
//!   hudclip config [--init]                        Show or create the configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hudclip_common::config::{force_cpu_from_env, AppConfig};

mod commands;

use commands::job::ClipArgs;

#[derive(Parser)]
#[command(
    name = "hudclip",
    about = "Trim, compress and reframe gameplay recordings into shareable highlights",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this configuration file instead of the standard location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a highlight clip
    Render(ClipArgs),

    /// Print the derived encode plan and encoder arguments without running anything
    Plan(ClipArgs),

    /// Show resolution, duration, size and audio bitrate of a source file
    Probe {
        /// Source video
        input: PathBuf,
    },

    /// Check that ffmpeg and ffprobe are runnable
    Check,

    /// Show the active configuration
    Config {
        /// Write a default configuration file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    if force_cpu_from_env() {
        config.force_cpu = true;
    }

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    hudclip_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Render(args) => commands::render::run(args, &config).await,
        Commands::Plan(args) => commands::plan::run(args, &config),
        Commands::Probe { input } => commands::probe::run(input, &config),
        Commands::Check => commands::check::run(&config),
        Commands::Config { init } => commands::config::run(init, cli.config, &config),
    }
}
