#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use quay_core::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "quay")]
#[command(author, version, about = "A minimal npm-style package manager", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted logs and summaries
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Resolve and install one package and record it in package.json
    Add {
        /// Package spec, e.g. `left-pad`, `axios@1.7`, `react@^18.0.0`
        package: String,
    },

    /// Install every dependency declared in package.json
    Install,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.json);

    let cwd = match cli.cwd {
        Some(path) => path,
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json(cli.json);

    match cli.command {
        Commands::Add { package } => commands::add::run(&config, &package).await,
        Commands::Install => commands::install::run(&config).await,
    }
}
