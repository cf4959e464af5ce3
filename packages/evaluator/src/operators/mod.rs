//! # Operators
//!
//! Pure, registry-dispatched functions `(evaluated input, context) -> value`.
//!
//! An operator is invoked by a map whose first key is its registered name:
//! `{"Math.add": [1, {"var": "count"}]}`. The evaluator evaluates the input
//! before the operator sees it. Operators may read the context but never
//! mutate it, and malformed input yields `Node::Null` instead of an error.

mod array;
mod conditional;
mod logic;
mod math;
mod storage;
mod string;

use crate::context::Context;
use std::collections::HashMap;
use std::rc::Rc;
use tessera_common::{KeyValueStore, Node};

/// A pure function plugged into the evaluator
pub trait Operator {
    /// Registered name, e.g. `"Math.add"`
    fn name(&self) -> &str;

    /// Compute a value from already-evaluated input
    fn apply(&self, input: &Node, context: &Context) -> Node;
}

struct FnOperator<F> {
    name: String,
    function: F,
}

impl<F> Operator for FnOperator<F>
where
    F: Fn(&Node, &Context) -> Node,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: &Node, context: &Context) -> Node {
        (self.function)(input, context)
    }
}

/// Name → operator lookup table
#[derive(Default)]
pub struct OperatorRegistry {
    operators: HashMap<String, Box<dyn Operator>>,
}

impl OperatorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in operator. `Storage.get` reads from `storage`.
    pub fn with_builtins(storage: Rc<dyn KeyValueStore>) -> Self {
        let mut registry = Self::new();
        math::register(&mut registry);
        logic::register(&mut registry);
        string::register(&mut registry);
        array::register(&mut registry);
        conditional::register(&mut registry);
        storage::register(&mut registry, storage);
        registry
    }

    /// Register an operator, replacing any operator with the same name
    pub fn register(&mut self, operator: impl Operator + 'static) {
        self.operators
            .insert(operator.name().to_string(), Box::new(operator));
    }

    /// Register a closure as an operator
    pub fn register_fn<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&Node, &Context) -> Node + 'static,
    {
        self.register(FnOperator {
            name: name.into(),
            function,
        });
    }

    pub fn get(&self, name: &str) -> Option<&dyn Operator> {
        self.operators.get(name).map(|operator| operator.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

/// Operand list of an operator: a sequence input, or a lone value as a
/// one-element list
pub(crate) fn operands(input: &Node) -> &[Node] {
    match input {
        Node::Sequence(items) => items,
        other => std::slice::from_ref(other),
    }
}

/// Single operand of a unary operator, unwrapping one-element sequences
pub(crate) fn single_operand(input: &Node) -> &Node {
    match input {
        Node::Sequence(items) if items.len() == 1 => &items[0],
        other => other,
    }
}

/// Number operand truncated toward zero
pub(crate) fn integer_operand(node: &Node) -> Option<i64> {
    node.as_f64()
        .filter(|n| n.is_finite())
        .map(|n| n.trunc() as i64)
}
