//! # Commands
//!
//! Effectful, registry-dispatched actions. A command node is a map with
//! exactly one key, the command name; the value under it is handed to the
//! command untouched as its payload. Commands evaluate whatever parts of
//! their payload they need through the [`CommandScope`].
//!
//! A command never aborts its caller. Malformed payloads are logged and
//! ignored, so one broken command in a `sequence` does not stop the rest.

mod control;
mod log;
mod navigation;
mod state;
mod storage;

use crate::context::Context;
use crate::evaluator::Evaluator;
use crate::interpreter::Interpreter;
use std::collections::HashMap;
use tessera_common::Node;

/// An effectful action plugged into the interpreter
pub trait Command {
    /// Registered name, e.g. `"set"`
    fn name(&self) -> &str;

    /// Run the command with its raw payload
    fn execute(&self, payload: &Node, scope: &CommandScope<'_>);
}

/// What a running command can reach: the interpreter and the context it
/// runs against
#[derive(Clone, Copy)]
pub struct CommandScope<'a> {
    pub interpreter: &'a Interpreter,
    pub context: &'a Context,
}

impl<'a> CommandScope<'a> {
    pub fn new(interpreter: &'a Interpreter, context: &'a Context) -> Self {
        Self {
            interpreter,
            context,
        }
    }

    pub fn evaluator(&self) -> &'a Evaluator {
        self.interpreter.evaluator()
    }

    /// Evaluate an expression against the scope's context
    pub fn evaluate(&self, node: &Node) -> Node {
        self.interpreter.evaluate(node, self.context)
    }

    /// Evaluate the value under `key` of a payload map, null when absent
    pub fn evaluate_field(&self, payload: &Node, key: &str) -> Node {
        payload
            .get(key)
            .map(|node| self.evaluate(node))
            .unwrap_or(Node::Null)
    }

    /// Run a nested command on the same context
    pub fn execute(&self, command: &Node) {
        self.interpreter.execute(command, self.context);
    }

    /// Run a nested event (one command or a list of them) on the same context
    pub fn handle_event(&self, event: &Node) {
        self.interpreter.handle_event(event, self.context);
    }
}

struct FnCommand<F> {
    name: String,
    function: F,
}

impl<F> Command for FnCommand<F>
where
    F: Fn(&Node, &CommandScope<'_>),
{
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, payload: &Node, scope: &CommandScope<'_>) {
        (self.function)(payload, scope)
    }
}

/// Name → command lookup table
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in command, `HttpRequest.request` included
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        state::register(&mut registry);
        control::register(&mut registry);
        navigation::register(&mut registry);
        storage::register(&mut registry);
        log::register(&mut registry);
        crate::http::register(&mut registry);
        registry
    }

    /// Register a command, replacing any command with the same name
    pub fn register(&mut self, command: impl Command + 'static) {
        self.commands
            .insert(command.name().to_string(), Box::new(command));
    }

    /// Register a closure as a command
    pub fn register_fn<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&Node, &CommandScope<'_>) + 'static,
    {
        self.register(FnCommand {
            name: name.into(),
            function,
        });
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|command| command.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Split a command node into `(name, payload)`; `None` unless it is a map
/// with exactly one key
pub fn command_parts(command: &Node) -> Option<(&str, &Node)> {
    match command {
        Node::Mapping(map) if map.len() == 1 => {
            map.first().map(|(name, payload)| (name.as_str(), payload))
        }
        _ => None,
    }
}
