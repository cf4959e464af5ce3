use super::OperatorRegistry;
use std::rc::Rc;
use tessera_common::{KeyValueStore, Node};
use tracing::debug;

/// `Storage.get`: input is a key string or `{key: ...}`
pub(super) fn register(registry: &mut OperatorRegistry, storage: Rc<dyn KeyValueStore>) {
    registry.register_fn("Storage.get", move |input, _| {
        let key = match input {
            Node::String(key) => Some(key.as_str()),
            Node::Mapping(fields) => fields.get("key").and_then(Node::as_str),
            _ => None,
        };

        match key {
            Some(key) => storage.get(key).unwrap_or(Node::Null),
            None => {
                debug!(input_type = input.type_name(), "Storage.get without a key");
                Node::Null
            }
        }
    });
}
