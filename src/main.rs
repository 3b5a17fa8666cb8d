use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use personasplit::cli;

#[derive(Parser)]
#[command(name = "personasplit", version)]
#[command(about = "Split an agent configuration tree into core and persona", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a source tree and report the persona manifest
    Extract {
        /// Source directory (e.g. a project's .claude directory)
        source: String,

        /// Path to config file (defaults to ./personasplit.toml, then the user config dir)
        #[arg(long)]
        config: Option<String>,

        /// Brand token for path remapping (defaults to config, then the inferred persona name)
        #[arg(long)]
        brand: Option<String>,

        /// Print manifest and slot registry as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace brand literals in a file with slot placeholders
    Slotify {
        /// File to rewrite (printed to stdout, never modified)
        file: String,

        /// Brand token to neutralize (e.g. "moai")
        #[arg(long)]
        brand: String,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Extract {
            source,
            config,
            brand,
            json,
        } => {
            cli::extract::run(&source, config.as_deref(), brand, json)?;
        }
        Commands::Slotify { file, brand } => {
            cli::slotify::run(&file, &brand)?;
        }
    }

    Ok(())
}
