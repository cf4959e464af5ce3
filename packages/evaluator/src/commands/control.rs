//! Control flow: `sequence` and `if`

use super::{CommandRegistry, CommandScope};
use tessera_common::Node;
use tracing::{trace, warn};

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register_fn("sequence", sequence);
    registry.register_fn("if", conditional);
}

/// Run each command in order. A failing command does not stop the rest.
fn sequence(payload: &Node, scope: &CommandScope<'_>) {
    let Node::Sequence(commands) = payload else {
        warn!(payload_type = payload.type_name(), "sequence expects a list of commands");
        return;
    };

    for (position, command) in commands.iter().enumerate() {
        trace!(position, "sequence step");
        scope.execute(command);
    }
}

/// `{condition, then?, else?}`; only a literal `true` selects `then`, so a
/// missing condition takes the `else` branch
fn conditional(payload: &Node, scope: &CommandScope<'_>) {
    if !matches!(payload, Node::Mapping(_)) {
        warn!(payload_type = payload.type_name(), "if expects a map payload");
        return;
    }

    let branch = if scope.evaluate_field(payload, "condition").is_true() {
        "then"
    } else {
        "else"
    };
    trace!(branch, "if branch selected");

    if let Some(node @ (Node::Mapping(_) | Node::Sequence(_))) = payload.get(branch) {
        scope.handle_event(node);
    }
}
