mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, eval, run, CheckArgs, EvalArgs, RunArgs};
use config::Config;
use tracing_subscriber::EnvFilter;

/// Tessera CLI - run JSON-defined apps headlessly
#[derive(Parser, Debug)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Launch an app, optionally handle one event, and print the resulting state
    Run(RunArgs),

    /// Launch an app and evaluate one expression against its context
    Eval(EvalArgs),

    /// Validate an app definition
    Check(CheckArgs),
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_filter.as_deref().unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(err: anyhow::Error) -> ! {
    eprintln!();
    eprintln!("{} {:#}", "Error:".red().bold(), err);
    eprintln!();
    std::process::exit(1);
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => fail(anyhow::anyhow!("Cannot get current directory: {}", err)),
    };

    let config = match Config::load(&cwd) {
        Ok(config) => config,
        Err(err) => fail(err.context("Failed to load configuration")),
    };
    init_tracing(&config);

    let result = match cli.command {
        Command::Run(args) => run(args, &config, &cwd).await,
        Command::Eval(args) => eval(args, &config, &cwd).await,
        Command::Check(args) => check(args),
    };

    if let Err(err) = result {
        fail(err);
    }
}
