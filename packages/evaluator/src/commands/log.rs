use super::CommandRegistry;
use tracing::info;

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register_fn("log", |payload, scope| {
        let message = scope.evaluate(payload);
        info!(target: "tessera::log", "{}", message.display_string());
    });
}
