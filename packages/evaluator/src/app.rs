//! # App Definition
//!
//! A compiled app is one JSON document:
//!
//! ```json
//! {
//!   "mainScreenId": "home",
//!   "screens": [{ "id": "home", "onAppear": { "set": { "var": "ready", "value": true } } }],
//!   "initialContextVariables": { "count": 0 }
//! }
//! ```
//!
//! [`Session::launch`] turns a definition plus an [`Interpreter`] into a
//! running session with its own [`Context`].

use crate::context::{Context, ResolveReport};
use crate::http::HttpError;
use crate::interpreter::Interpreter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tessera_common::{Node, NodeMap};
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid app definition: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Main screen '{0}' is not defined")]
    MissingMainScreen(String),

    #[error("Screen '{0}' is defined more than once")]
    DuplicateScreen(String),

    #[error("Screen with an empty id")]
    EmptyScreenId,

    #[error(transparent)]
    Http(#[from] HttpError),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screen {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_appear: Option<Node>,

    /// Everything else the renderer consumes (`type`, `body`, `modifiers`, ...)
    #[serde(flatten)]
    pub body: NodeMap,
}

impl Screen {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            on_appear: None,
            body: NodeMap::new(),
        }
    }

    pub fn with_on_appear(mut self, event: Node) -> Self {
        self.on_appear = Some(event);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDefinition {
    pub main_screen_id: String,

    #[serde(default)]
    pub screens: Vec<Screen>,

    #[serde(default)]
    pub initial_context_variables: NodeMap,
}

impl AppDefinition {
    pub fn from_json(source: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| AppError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&source)
    }

    pub fn screen(&self, id: &str) -> Option<&Screen> {
        self.screens.iter().find(|screen| screen.id == id)
    }

    /// Screen ids must be non-empty and unique, and the main screen must exist
    pub fn validate(&self) -> AppResult<()> {
        let mut seen = HashSet::new();
        for screen in &self.screens {
            if screen.id.is_empty() {
                return Err(AppError::EmptyScreenId);
            }
            if !seen.insert(screen.id.as_str()) {
                return Err(AppError::DuplicateScreen(screen.id.clone()));
            }
        }

        if !seen.contains(self.main_screen_id.as_str()) {
            return Err(AppError::MissingMainScreen(self.main_screen_id.clone()));
        }
        Ok(())
    }
}

/// A launched app: definition, interpreter and the root context
#[derive(Debug)]
pub struct Session {
    definition: AppDefinition,
    interpreter: Interpreter,
    context: Context,
    resolve_report: ResolveReport,
}

impl Session {
    /// Validate the definition, seed the context with the initial variables,
    /// resolve expression-valued variables, set the navigation root and fire
    /// the main screen's `onAppear`
    #[instrument(skip_all, fields(main_screen = %definition.main_screen_id))]
    pub fn launch(definition: AppDefinition, interpreter: Interpreter) -> AppResult<Self> {
        definition.validate()?;

        let context = Context::with_variables(definition.initial_context_variables.clone());
        let resolve_report = interpreter.resolve_expressions(&context);
        if !resolve_report.converged {
            warn!(
                iterations = resolve_report.iterations,
                "Initial variables still changing after the last pass"
            );
        }

        for screen in &definition.screens {
            interpreter.register_screen(screen.clone());
        }
        interpreter.navigator().set_root(&definition.main_screen_id);

        info!(
            screens = definition.screens.len(),
            variables = context.variable_names().len(),
            "Session launched"
        );

        if let Some(on_appear) = interpreter.on_appear(&definition.main_screen_id) {
            interpreter.handle_event(&on_appear, &context);
        }

        Ok(Self {
            definition,
            interpreter,
            context,
            resolve_report,
        })
    }

    pub fn definition(&self) -> &AppDefinition {
        &self.definition
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Outcome of the initial variable resolution
    pub fn resolve_report(&self) -> ResolveReport {
        self.resolve_report
    }

    pub fn handle_event(&self, event: &Node) {
        self.interpreter.handle_event(event, &self.context);
    }

    pub fn evaluate(&self, node: &Node) -> Node {
        self.interpreter.evaluate(node, &self.context)
    }

    pub fn drain_completions(&self) -> usize {
        self.interpreter.drain_completions()
    }

    pub async fn settle(&self) -> usize {
        self.interpreter.settle().await
    }
}
