//! # Expression Evaluator
//!
//! Recursively evaluates a [`Node`] against a [`Context`].
//!
//! ## Dispatch order
//!
//! The first matching rule wins:
//!
//! 1. `null` evaluates to `null`.
//! 2. `{"var": "path"}` (exactly one key, string value) reads the path.
//!    When the context carries a loop index, the index placeholder inside
//!    the path (`$index` by default) is replaced by that index first.
//! 3. A map whose first key is a registered operator evaluates the value
//!    under that key (element-wise for sequences) and applies the operator.
//! 4. Any other map is a literal object: every value is evaluated, keys are
//!    kept.
//! 5. A sequence is a literal array: every element is evaluated.
//! 6. Scalars evaluate to themselves.
//!
//! The `var` form is checked before operators, and a map is never treated
//! as an operator call unless its first key is actually registered.
//!
//! ## Purity
//!
//! Evaluation never mutates the context and never fails: path misses,
//! malformed paths and malformed operator input all degrade to `null`.

use crate::config::RuntimeConfig;
use crate::context::Context;
use crate::operators::OperatorRegistry;
use crate::path::{resolve_components, write_components, PathCache, PathResult};
use std::borrow::Cow;
use tessera_common::{Node, NodeMap};
use tracing::{debug, trace, warn};

/// Key of the variable-read form `{"var": "path"}`
pub const VAR_KEY: &str = "var";

/// Nesting depth past which evaluation gives up and yields null
const MAX_DEPTH: usize = 256;

/// How the evaluator sees one node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expression<'a> {
    Null,
    Variable(&'a str),
    Operator { name: &'a str, input: &'a Node },
    Object(&'a NodeMap),
    Array(&'a [Node]),
    Literal(&'a Node),
}

impl Expression<'_> {
    /// True for the forms whose value depends on the context or an operator
    pub fn is_evaluable(&self) -> bool {
        matches!(self, Expression::Variable(_) | Expression::Operator { .. })
    }
}

pub struct Evaluator {
    operators: OperatorRegistry,
    paths: PathCache,
    index_placeholder: String,
}

impl Evaluator {
    pub fn new(operators: OperatorRegistry) -> Self {
        Self::with_config(operators, &RuntimeConfig::default())
    }

    pub fn with_config(operators: OperatorRegistry, config: &RuntimeConfig) -> Self {
        Self {
            operators,
            paths: PathCache::new(),
            index_placeholder: config.index_placeholder.clone(),
        }
    }

    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    pub fn operators_mut(&mut self) -> &mut OperatorRegistry {
        &mut self.operators
    }

    pub fn path_cache(&self) -> &PathCache {
        &self.paths
    }

    /// Classify a node according to the dispatch order
    pub fn classify<'a>(&self, node: &'a Node) -> Expression<'a> {
        match node {
            Node::Null => Expression::Null,
            Node::Mapping(map) => {
                if map.len() == 1 {
                    if let Some(Node::String(path)) = map.get(VAR_KEY) {
                        return Expression::Variable(path);
                    }
                }
                match map.first() {
                    Some((name, input)) if self.operators.contains(name) => {
                        Expression::Operator { name, input }
                    }
                    _ => Expression::Object(map),
                }
            }
            Node::Sequence(items) => Expression::Array(items),
            scalar => Expression::Literal(scalar),
        }
    }

    /// True when `node` is a variable read or an operator invocation
    pub fn is_expression(&self, node: &Node) -> bool {
        self.classify(node).is_evaluable()
    }

    /// Evaluate a node against a context
    pub fn evaluate(&self, node: &Node, context: &Context) -> Node {
        self.evaluate_at(node, context, 0)
    }

    fn evaluate_at(&self, node: &Node, context: &Context, depth: usize) -> Node {
        if depth > MAX_DEPTH {
            warn!(max_depth = MAX_DEPTH, "Expression nested too deeply, yielding null");
            return Node::Null;
        }

        match self.classify(node) {
            Expression::Null => Node::Null,
            Expression::Variable(path) => self.resolve_path(path, context),
            Expression::Operator { name, input } => {
                let input = self.evaluate_at(input, context, depth + 1);
                match self.operators.get(name) {
                    Some(operator) => {
                        trace!(operator = name, "Applying operator");
                        operator.apply(&input, context)
                    }
                    None => Node::Null,
                }
            }
            Expression::Object(map) => Node::Mapping(
                map.iter()
                    .map(|(key, value)| (key.clone(), self.evaluate_at(value, context, depth + 1)))
                    .collect(),
            ),
            Expression::Array(items) => Node::Sequence(
                items
                    .iter()
                    .map(|item| self.evaluate_at(item, context, depth + 1))
                    .collect(),
            ),
            Expression::Literal(scalar) => scalar.clone(),
        }
    }

    /// Read a path string against the context. Never fails.
    pub fn resolve_path(&self, path: &str, context: &Context) -> Node {
        let path = self.substitute_index(path, context);
        match self.paths.parse(&path) {
            Ok(components) => resolve_components(context, &components),
            Err(err) => {
                debug!(path = %path, error = %err, "Unparseable variable path");
                Node::Null
            }
        }
    }

    /// Write `value` at a path string
    pub fn write_path(&self, path: &str, value: Node, context: &Context) -> PathResult<()> {
        let path = self.substitute_index(path, context);
        let components = self.paths.parse(&path)?;
        write_components(context, &components, value)
    }

    /// Replace the index placeholder with the context's loop index, if any
    pub fn substitute_index<'a>(&self, path: &'a str, context: &Context) -> Cow<'a, str> {
        match context.current_index() {
            Some(index)
                if !self.index_placeholder.is_empty() && path.contains(&self.index_placeholder) =>
            {
                Cow::Owned(path.replace(&self.index_placeholder, &index.to_string()))
            }
            _ => Cow::Borrowed(path),
        }
    }

    /// Evaluate presentation modifiers (`[{name: value}, ...]`) in order.
    ///
    /// Entries that are not single-key maps are skipped.
    pub fn evaluate_modifiers(&self, modifiers: &[Node], context: &Context) -> Vec<(String, Node)> {
        modifiers
            .iter()
            .filter_map(|modifier| match modifier {
                Node::Mapping(map) if map.len() == 1 => map.first(),
                other => {
                    debug!(modifier_type = other.type_name(), "Skipping malformed modifier");
                    None
                }
            })
            .map(|(name, value)| (name.clone(), self.evaluate(value, context)))
            .collect()
    }
}
