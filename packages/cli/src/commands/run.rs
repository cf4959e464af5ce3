use super::{launch_session, parse_node};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use tessera_evaluator::{NodeMap, Session};

#[derive(Debug, Args)]
pub struct RunArgs {
    /// App definition (JSON)
    pub app: PathBuf,

    /// Event to handle after launch, as JSON (a command or a list of commands)
    #[arg(short, long)]
    pub event: Option<String>,

    /// Skip waiting for in-flight HTTP requests
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunOutput {
    context: NodeMap,
    navigation: NavigationOutput,
    converged: bool,
    completions: usize,
}

#[derive(Debug, Serialize)]
struct NavigationOutput {
    root: Option<String>,
    stack: Vec<String>,
}

pub async fn run(args: RunArgs, config: &Config, cwd: &str) -> Result<()> {
    let event = args
        .event
        .as_deref()
        .map(|source| parse_node(source, "event"))
        .transpose()?;

    let session = launch_session(&args.app, config, cwd)?;
    if !session.resolve_report().converged {
        eprintln!(
            "{}",
            "⚠️  Initial context did not settle within the iteration cap".yellow()
        );
    }

    if let Some(event) = &event {
        session.handle_event(event);
    }

    let completions = if args.no_wait {
        session.drain_completions()
    } else {
        session.settle().await
    };

    let output = snapshot(&session, completions);
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn snapshot(session: &Session, completions: usize) -> RunOutput {
    let navigator = session.interpreter().navigator();
    RunOutput {
        context: session.context().snapshot(),
        navigation: NavigationOutput {
            root: navigator.current_root(),
            stack: navigator.stack(),
        },
        converged: session.resolve_report().converged,
        completions,
    }
}
