//! `navigate`, `pop` and `popToRoot` against the interpreter's navigator

use super::{CommandRegistry, CommandScope};
use tessera_common::Node;
use tracing::{debug, warn};

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register_fn("navigate", navigate);
    registry.register_fn("pop", |_, scope| {
        if let Some(screen) = scope.interpreter.navigator().pop() {
            debug!(screen = %screen, "Popped screen");
        }
    });
    registry.register_fn("popToRoot", |_, scope| {
        scope.interpreter.navigator().pop_to_root();
    });
}

/// Push a screen id, then fire the screen's `onAppear` when it is known
fn navigate(payload: &Node, scope: &CommandScope<'_>) {
    let screen = match scope.evaluate(payload) {
        Node::String(id) if !id.is_empty() => id,
        number @ Node::Number(_) => number.display_string(),
        other => {
            warn!(payload_type = other.type_name(), "navigate expects a screen id");
            return;
        }
    };

    debug!(screen = %screen, "Navigating");
    scope.interpreter.navigator().push(&screen);

    if let Some(on_appear) = scope.interpreter.on_appear(&screen) {
        scope.handle_event(&on_appear);
    }
}
