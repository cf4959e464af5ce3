//! Equality, boolean logic and numeric comparison.
//!
//! Equality is structural: sequences compare element by element in order,
//! mappings compare key sets and values. Boolean operators treat anything
//! that is not `true` as false.

use super::{operands, single_operand, OperatorRegistry};
use tessera_common::Node;

pub(super) fn register(registry: &mut OperatorRegistry) {
    registry.register_fn("Logic.eq", |input, _| equality(input).into());
    registry.register_fn("Logic.neq", |input, _| equality(input).map(|eq| !eq).into());
    registry.register_fn("Logic.and", |input, _| {
        Node::Bool(operands(input).iter().all(Node::is_true))
    });
    registry.register_fn("Logic.or", |input, _| {
        Node::Bool(operands(input).iter().any(Node::is_true))
    });
    registry.register_fn("Logic.not", |input, _| {
        Node::Bool(!single_operand(input).is_true())
    });
    registry.register_fn("Logic.gt", |input, _| compare(input, |a, b| a > b));
    registry.register_fn("Logic.gte", |input, _| compare(input, |a, b| a >= b));
    registry.register_fn("Logic.lt", |input, _| compare(input, |a, b| a < b));
    registry.register_fn("Logic.lte", |input, _| compare(input, |a, b| a <= b));
}

/// All operands structurally equal; `None` with fewer than two operands
fn equality(input: &Node) -> Option<bool> {
    match input {
        Node::Sequence(items) if items.len() >= 2 => {
            Some(items[1..].iter().all(|item| *item == items[0]))
        }
        _ => None,
    }
}

fn compare(input: &Node, predicate: impl Fn(f64, f64) -> bool) -> Node {
    match operands(input) {
        [Node::Number(a), Node::Number(b)] => Node::Bool(predicate(*a, *b)),
        _ => Node::Bool(false),
    }
}
