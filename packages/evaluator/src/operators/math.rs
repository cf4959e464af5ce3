//! Arithmetic over evaluated number lists. Non-numeric operands are
//! dropped before reducing; division or modulo by zero yields null.

use super::{operands, OperatorRegistry};
use tessera_common::Node;

pub(super) fn register(registry: &mut OperatorRegistry) {
    registry.register_fn("Math.add", |input, _| reduce(input, |a, b| Some(a + b)));
    registry.register_fn("Math.subtract", |input, _| reduce(input, |a, b| Some(a - b)));
    registry.register_fn("Math.multiply", |input, _| reduce(input, |a, b| Some(a * b)));
    registry.register_fn("Math.divide", |input, _| {
        reduce(input, |a, b| (b != 0.0).then(|| a / b))
    });
    registry.register_fn("Math.mod", |input, _| {
        reduce(input, |a, b| (b != 0.0).then(|| a % b))
    });
    registry.register_fn("Math.min", |input, _| reduce(input, |a, b| Some(a.min(b))));
    registry.register_fn("Math.max", |input, _| reduce(input, |a, b| Some(a.max(b))));
}

fn reduce(input: &Node, step: impl Fn(f64, f64) -> Option<f64>) -> Node {
    let mut numbers = operands(input).iter().filter_map(Node::as_f64);
    let Some(first) = numbers.next() else {
        return Node::Null;
    };

    numbers
        .try_fold(first, step)
        .map(Node::Number)
        .unwrap_or(Node::Null)
}
