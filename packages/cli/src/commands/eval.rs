use super::{launch_session, parse_node};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct EvalArgs {
    /// App definition (JSON)
    pub app: PathBuf,

    /// Expression to evaluate, as JSON
    pub expression: String,

    /// Print compact JSON
    #[arg(long)]
    pub compact: bool,
}

pub async fn eval(args: EvalArgs, config: &Config, cwd: &str) -> Result<()> {
    let expression = parse_node(&args.expression, "expression")?;

    let session = launch_session(&args.app, config, cwd)?;
    // onAppear may have issued requests whose results feed the expression
    session.settle().await;

    let value = session.evaluate(&expression);
    let output = if args.compact {
        serde_json::to_string(&value)?
    } else {
        serde_json::to_string_pretty(&value)?
    };
    println!("{}", output);
    Ok(())
}
