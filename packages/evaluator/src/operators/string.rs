//! String operators. Positions and lengths count characters, not bytes.

use super::{integer_operand, operands, single_operand, OperatorRegistry};
use tessera_common::Node;

pub(super) fn register(registry: &mut OperatorRegistry) {
    registry.register_fn("String.trim", |input, _| {
        map_str(input, |s| s.trim().to_string())
    });
    registry.register_fn("String.uppercase", |input, _| {
        map_str(input, |s| s.to_uppercase())
    });
    registry.register_fn("String.lowercase", |input, _| {
        map_str(input, |s| s.to_lowercase())
    });
    registry.register_fn("String.length", |input, _| {
        match single_operand(input) {
            Node::String(s) => Node::from(s.chars().count()),
            _ => Node::Null,
        }
    });
    registry.register_fn("String.concat", |input, _| concat(input));
    registry.register_fn("String.indexOf", |input, _| index_of(input));
    registry.register_fn("String.substring", |input, _| substring(input));
}

fn map_str(input: &Node, f: impl Fn(&str) -> String) -> Node {
    match single_operand(input) {
        Node::String(s) => Node::String(f(s)),
        _ => Node::Null,
    }
}

fn concat(input: &Node) -> Node {
    let joined: String = operands(input)
        .iter()
        .filter(|part| !part.is_null())
        .map(Node::display_string)
        .collect();
    Node::String(joined)
}

/// `[source, search]` → character offset of the first match, or -1
fn index_of(input: &Node) -> Node {
    let [Node::String(source), Node::String(search)] = operands(input) else {
        return Node::Null;
    };

    let position = source
        .find(search.as_str())
        .map(|byte_offset| source[..byte_offset].chars().count() as f64)
        .unwrap_or(-1.0);
    Node::Number(position)
}

/// `[source, start, length?]`.
///
/// A negative start or length, or a start past the end, yields `""`.
/// A length running past the end yields the tail.
fn substring(input: &Node) -> Node {
    let args = operands(input);
    let Some(Node::String(source)) = args.first() else {
        return Node::Null;
    };
    let Some(start) = args.get(1).and_then(integer_operand) else {
        return Node::Null;
    };
    let length = match args.get(2) {
        Some(node) => match integer_operand(node) {
            Some(length) => Some(length),
            None => return Node::Null,
        },
        None => None,
    };

    let char_count = source.chars().count() as i64;
    if start < 0 || start > char_count || length.is_some_and(|l| l < 0) {
        return Node::String(String::new());
    }

    let take = length.unwrap_or(char_count - start).min(char_count - start);
    Node::String(
        source
            .chars()
            .skip(start as usize)
            .take(take as usize)
            .collect(),
    )
}
