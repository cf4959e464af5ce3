pub mod app;
pub mod commands;
pub mod config;
pub mod context;
pub mod evaluator;
pub mod http;
pub mod interpreter;
pub mod navigation;
pub mod operators;
pub mod path;


#[cfg(test)]
mod tests_commands;

#[cfg(test)]
mod tests_http;

pub use app::{AppDefinition, AppError, AppResult, Screen, Session};
pub use commands::{Command, CommandRegistry, CommandScope};
pub use config::RuntimeConfig;
pub use context::{Context, ObserverId, ResolveReport, WillChange};
pub use evaluator::{Evaluator, Expression};
pub use http::{HttpDispatcher, HttpError, HttpRequest, HttpResponse, HttpResult, HttpTransport, ReqwestTransport};
pub use interpreter::{Interpreter, InterpreterBuilder};
pub use navigation::{NavigationStack, Navigator};
pub use operators::{Operator, OperatorRegistry};
pub use path::{PathCache, PathComponent, PathError, PathResult};

pub use tessera_common::{JsonFileStore, KeyValueStore, MemoryStore, Node, NodeMap};
