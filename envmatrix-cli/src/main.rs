//! envmatrix - expand and run declarative test environment matrices
//!
//! ## Commands
//!
//! - `validate`: parse the declaration and report problems
//! - `list`: print environment names in declared order
//! - `show`: print the expanded execution plans
//! - `run`: execute the plans and report per-environment results

mod commands;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{run::RunArgs, show::ShowArgs, Source};
use matrix_service::ParserOptions;

#[derive(Parser, Debug)]
#[command(name = "envmatrix")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Expand and run declarative test environment matrices", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Declaration file (default: search upwards for tox.ini or envmatrix.ini)
    #[arg(short, long, global = true, env = "ENVMATRIX_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Reject unknown keys in the matrix and environment sections
    #[arg(long, global = true)]
    strict_keys: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse and validate the declaration
    Validate,

    /// List environment names in declared order
    List,

    /// Show expanded execution plans
    Show(ShowArgs),

    /// Run the matrix
    Run(RunArgs),
}

fn init_tracing(level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .ok();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(if cli.verbose { Level::DEBUG } else { Level::WARN });

    let source = Source {
        config: cli.config.as_deref(),
        options: ParserOptions {
            strict_keys: cli.strict_keys,
        },
    };
    match cli.command {
        Commands::Validate => commands::validate::execute(source),
        Commands::List => commands::list::execute(source),
        Commands::Show(args) => commands::show::execute(source, args),
        Commands::Run(args) => commands::run::execute(source, args).await,
    }
}
