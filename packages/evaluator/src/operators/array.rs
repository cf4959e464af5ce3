//! Array operators. Elements are compared loosely, by their string
//! representation, so `1` matches `"1"`.

use super::{operands, OperatorRegistry};
use tessera_common::Node;

pub(super) fn register(registry: &mut OperatorRegistry) {
    registry.register_fn("Array.indexOf", |input, _| {
        match position(input) {
            Some(found) => Node::from(found.map(|i| i as i64).unwrap_or(-1)),
            None => Node::Null,
        }
    });
    registry.register_fn("Array.contains", |input, _| {
        match position(input) {
            Some(found) => Node::Bool(found.is_some()),
            None => Node::Bool(false),
        }
    });
    registry.register_fn("Array.count", |input, _| match input {
        Node::Sequence(items) => Node::from(items.len()),
        _ => Node::Null,
    });
}

/// `[array, element]` → `Some(position)`; `None` when the input is malformed
fn position(input: &Node) -> Option<Option<usize>> {
    let [Node::Sequence(items), needle] = operands(input) else {
        return None;
    };

    let needle = needle.display_string();
    Some(items.iter().position(|item| item.display_string() == needle))
}
