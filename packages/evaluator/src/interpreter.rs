//! # Interpreter
//!
//! One interpreter per running app. It owns the evaluator, the command
//! registry and every collaborator a command can reach (navigation, key-value
//! storage, HTTP). Nothing is global: two interpreters never share state.
//!
//! All methods run on the caller's thread. HTTP completions are only applied
//! when [`Interpreter::drain_completions`] or [`Interpreter::settle`] is
//! called, which keeps every context mutation on that thread.

use crate::app::Screen;
use crate::commands::{command_parts, CommandRegistry, CommandScope};
use crate::config::RuntimeConfig;
use crate::context::{Context, ResolveReport};
use crate::evaluator::Evaluator;
use crate::http::{self, HttpDispatcher, HttpResult, HttpTransport, ReqwestTransport};
use crate::navigation::{NavigationStack, Navigator};
use crate::operators::OperatorRegistry;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tessera_common::{KeyValueStore, MemoryStore, Node};
use tracing::{debug, info, instrument, trace, warn};

pub struct Interpreter {
    config: RuntimeConfig,
    evaluator: Evaluator,
    commands: CommandRegistry,
    navigator: Rc<dyn Navigator>,
    storage: Rc<dyn KeyValueStore>,
    http: HttpDispatcher,
    screens: RefCell<HashMap<String, Screen>>,
}

/// Collaborators default to an in-memory store, a fresh navigation stack and
/// a reqwest transport
#[derive(Default)]
pub struct InterpreterBuilder {
    config: RuntimeConfig,
    storage: Option<Rc<dyn KeyValueStore>>,
    navigator: Option<Rc<dyn Navigator>>,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl InterpreterBuilder {
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn storage(mut self, storage: Rc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn navigator(mut self, navigator: Rc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Fails only when the default reqwest client cannot be created
    pub fn build(self) -> HttpResult<Interpreter> {
        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(Duration::from_secs(
                self.config.http_timeout_secs,
            ))?),
        };
        let storage: Rc<dyn KeyValueStore> = self
            .storage
            .unwrap_or_else(|| Rc::new(MemoryStore::new()));
        let navigator: Rc<dyn Navigator> = self
            .navigator
            .unwrap_or_else(|| Rc::new(NavigationStack::new()));

        let operators = OperatorRegistry::with_builtins(Rc::clone(&storage));
        let evaluator = Evaluator::with_config(operators, &self.config);
        let commands = CommandRegistry::with_builtins();

        info!(
            operators = evaluator.operators().len(),
            commands = commands.len(),
            "Interpreter ready"
        );

        Ok(Interpreter {
            config: self.config,
            evaluator,
            commands,
            navigator,
            storage,
            http: HttpDispatcher::new(transport),
            screens: RefCell::default(),
        })
    }
}

impl Interpreter {
    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::default()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// For registering custom operators
    pub fn operators_mut(&mut self) -> &mut OperatorRegistry {
        self.evaluator.operators_mut()
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// For registering custom commands
    pub fn commands_mut(&mut self) -> &mut CommandRegistry {
        &mut self.commands
    }

    pub fn navigator(&self) -> &dyn Navigator {
        &*self.navigator
    }

    pub fn storage(&self) -> &dyn KeyValueStore {
        &*self.storage
    }

    pub fn http(&self) -> &HttpDispatcher {
        &self.http
    }

    pub fn register_screen(&self, screen: Screen) {
        trace!(screen = %screen.id, "Registering screen");
        self.screens.borrow_mut().insert(screen.id.clone(), screen);
    }

    pub fn has_screen(&self, id: &str) -> bool {
        self.screens.borrow().contains_key(id)
    }

    /// `onAppear` event of a registered screen
    pub fn on_appear(&self, id: &str) -> Option<Node> {
        self.screens
            .borrow()
            .get(id)
            .and_then(|screen| screen.on_appear.clone())
    }

    pub fn evaluate(&self, node: &Node, context: &Context) -> Node {
        self.evaluator.evaluate(node, context)
    }

    /// Evaluate presentation modifiers, in order
    pub fn evaluate_modifiers(&self, modifiers: &[Node], context: &Context) -> Vec<(String, Node)> {
        self.evaluator.evaluate_modifiers(modifiers, context)
    }

    /// Re-resolve expression-valued variables up to the configured cap
    pub fn resolve_expressions(&self, context: &Context) -> ResolveReport {
        context.resolve_expressions(&self.evaluator, self.config.resolve_iteration_cap)
    }

    /// Run one command node (`{name: payload}`). Malformed nodes and unknown
    /// names are logged and skipped.
    #[instrument(skip_all)]
    pub fn execute(&self, command: &Node, context: &Context) {
        let Some((name, payload)) = command_parts(command) else {
            warn!(node_type = command.type_name(), "Not a command node");
            return;
        };
        let Some(handler) = self.commands.get(name) else {
            warn!(command = name, "Unknown command");
            return;
        };

        debug!(command = name, "Executing command");
        handler.execute(payload, &CommandScope::new(self, context));
    }

    /// Run an event: one command, or a list of commands in order.
    /// Anything else is ignored.
    #[instrument(skip_all)]
    pub fn handle_event(&self, event: &Node, context: &Context) {
        match event {
            Node::Mapping(_) => self.execute(event, context),
            Node::Sequence(commands) => {
                for command in commands {
                    self.execute(command, context);
                }
            }
            Node::Null => {}
            other => debug!(event_type = other.type_name(), "Ignoring event"),
        }
    }

    /// Apply every HTTP completion that has already arrived. Returns how many
    /// were applied.
    pub fn drain_completions(&self) -> usize {
        let mut applied = 0;
        while let Some((pending, outcome)) = self.http.try_next() {
            http::complete(self, pending, outcome);
            applied += 1;
        }
        applied
    }

    /// Wait until no HTTP request is in flight, applying completions as they
    /// arrive, including those of requests started by callbacks
    pub async fn settle(&self) -> usize {
        let mut applied = self.drain_completions();
        while let Some((pending, outcome)) = self.http.next().await {
            http::complete(self, pending, outcome);
            applied += 1;
            applied += self.drain_completions();
        }
        debug!(applied, "HTTP requests settled");
        applied
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("config", &self.config)
            .field("commands", &self.commands.names())
            .field("screens", &self.screens.borrow().len())
            .field("http", &self.http)
            .finish()
    }
}
