//! `Storage.set`: write through to the key-value store

use super::CommandRegistry;
use tessera_common::Node;
use tracing::{debug, warn};

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register_fn("Storage.set", |payload, scope| {
        let key = match scope.evaluate_field(payload, "key") {
            Node::String(key) if !key.is_empty() => key,
            other => {
                warn!(key_type = other.type_name(), "Storage.set without a key");
                return;
            }
        };

        let value = scope.evaluate_field(payload, "value");
        debug!(key = %key, "Persisting value");
        scope.interpreter.storage().set(&key, value);
    });
}
