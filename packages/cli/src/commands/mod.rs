pub mod check;
pub mod eval;
pub mod run;

pub use check::{check, CheckArgs};
pub use eval::{eval, EvalArgs};
pub use run::{run, RunArgs};

use crate::config::Config;
use anyhow::{Context as _, Result};
use std::path::Path;
use std::rc::Rc;
use tessera_evaluator::{AppDefinition, Interpreter, JsonFileStore, Node, Session};

/// Build an interpreter from the config and launch the app at `app`
pub(crate) fn launch_session(app: &Path, config: &Config, cwd: &str) -> Result<Session> {
    let definition = AppDefinition::load(app)?;

    let mut builder = Interpreter::builder().config(config.runtime.clone());
    if let Some(path) = config.get_storage_path(cwd) {
        let store = JsonFileStore::open(&path)
            .with_context(|| format!("Cannot open storage file {}", path.display()))?;
        builder = builder.storage(Rc::new(store));
    }

    let interpreter = builder.build()?;
    Ok(Session::launch(definition, interpreter)?)
}

pub(crate) fn parse_node(source: &str, what: &str) -> Result<Node> {
    serde_json::from_str(source).with_context(|| format!("Invalid {} JSON", what))
}
