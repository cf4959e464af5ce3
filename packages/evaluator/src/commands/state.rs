//! `set` and `setAtPath`: evaluate a value and write it at a path

use super::{CommandRegistry, CommandScope};
use tessera_common::Node;
use tracing::{debug, warn};

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register_fn("set", |payload, scope| write(payload, "var", scope));
    registry.register_fn("setAtPath", |payload, scope| {
        write(payload, "path", scope)
    });
}

/// Payload `{<path_key>: "path", value: expr}`
fn write(payload: &Node, path_key: &str, scope: &CommandScope<'_>) {
    let Some(path) = payload.get(path_key).and_then(Node::as_str) else {
        warn!(
            path_key,
            payload_type = payload.type_name(),
            "Write command without a path string"
        );
        return;
    };

    let value = scope.evaluate_field(payload, "value");
    debug!(path, "Writing context value");

    if let Err(err) = scope.evaluator().write_path(path, value, scope.context) {
        warn!(path, error = %err, "Failed to write context value");
    }
}
