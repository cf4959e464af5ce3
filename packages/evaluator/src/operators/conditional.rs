use super::OperatorRegistry;
use tessera_common::Node;

/// `Operator.if`: `{condition, then, else?}`, returning the selected branch
/// value. A missing branch yields null.
pub(super) fn register(registry: &mut OperatorRegistry) {
    registry.register_fn("Operator.if", |input, _| {
        let Some(fields) = input.as_mapping() else {
            return Node::Null;
        };

        let condition = fields.get("condition").is_some_and(Node::is_true);
        let branch = if condition { "then" } else { "else" };
        fields.get(branch).cloned().unwrap_or(Node::Null)
    });
}
