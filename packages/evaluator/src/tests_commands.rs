/// Built-in commands run through the interpreter
use crate::*;
use async_trait::async_trait;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

struct OfflineTransport;

#[async_trait]
impl HttpTransport for OfflineTransport {
    async fn send(&self, _request: HttpRequest) -> HttpResult<HttpResponse> {
        Err(HttpError::Transport("offline".to_string()))
    }
}

struct Fixture {
    interpreter: Interpreter,
    context: Context,
    navigator: Rc<NavigationStack>,
    storage: Rc<MemoryStore>,
}

impl Fixture {
    fn new() -> Self {
        let navigator = Rc::new(NavigationStack::with_root("home"));
        let storage = Rc::new(MemoryStore::new());
        let interpreter = Interpreter::builder()
            .navigator(navigator.clone())
            .storage(storage.clone())
            .transport(Arc::new(OfflineTransport))
            .build()
            .unwrap();
        Self {
            interpreter,
            context: Context::new(),
            navigator,
            storage,
        }
    }

    fn run(&self, event: serde_json::Value) {
        self.interpreter
            .handle_event(&Node::from(event), &self.context);
    }

    fn get(&self, name: &str) -> Option<Node> {
        self.context.get(name)
    }
}

#[test]
fn test_set_bare_variable() {
    let fx = Fixture::new();
    fx.run(json!({"set": {"var": "name", "value": "Ada"}}));
    assert_eq!(fx.get("name"), Some(Node::from("Ada")));
}

#[test]
fn test_set_evaluates_value() {
    let fx = Fixture::new();
    fx.context.set("count", Node::from(1));
    fx.run(json!({"set": {"var": "count", "value": {"Math.add": [{"var": "count"}, 1]}}}));
    assert_eq!(fx.get("count"), Some(Node::from(2)));
}

#[test]
fn test_set_without_value_stores_null() {
    let fx = Fixture::new();
    fx.run(json!({"set": {"var": "cleared"}}));
    assert_eq!(fx.get("cleared"), Some(Node::Null));
}

#[test]
fn test_set_nested_path_initializes_containers() {
    let fx = Fixture::new();
    fx.run(json!({"set": {"var": "form.fields[2].value", "value": "x"}}));
    assert_eq!(
        fx.get("form"),
        Some(Node::from(json!({"fields": [null, null, {"value": "x"}]})))
    );
}

#[test]
fn test_set_nested_path_is_one_notification() {
    let fx = Fixture::new();
    fx.context.set("user", Node::from(json!({"name": "Ada", "tags": []})));

    let changes = Rc::new(RefCell::new(Vec::new()));
    let log = changes.clone();
    fx.context
        .observe(move |change| log.borrow_mut().push(change.name.to_string()));

    fx.run(json!({"set": {"var": "user.tags[0]", "value": "admin"}}));

    assert_eq!(*changes.borrow(), vec!["user".to_string()]);
    assert_eq!(
        fx.get("user"),
        Some(Node::from(json!({"name": "Ada", "tags": ["admin"]})))
    );
}

#[test]
fn test_set_replaces_scalar_in_the_way() {
    let fx = Fixture::new();
    fx.context.set("user", Node::from(json!({"name": "Ada"})));
    fx.context.set("count", Node::from(5));

    fx.run(json!({"set": {"var": "user.name.first", "value": "A"}}));
    fx.run(json!({"set": {"var": "count[0]", "value": 1}}));

    assert_eq!(fx.get("user"), Some(Node::from(json!({"name": {"first": "A"}}))));
    assert_eq!(fx.get("count"), Some(Node::from(json!([1]))));
}

#[test]
fn test_set_with_oversized_index_leaves_context_untouched() {
    let fx = Fixture::new();
    fx.context.set("items", Node::from(json!([1])));
    let revision = fx.context.revision();

    fx.run(json!({"set": {"var": "items[5000000]", "value": 2}}));

    assert_eq!(fx.get("items"), Some(Node::from(json!([1]))));
    assert_eq!(fx.context.revision(), revision);
}

#[test]
fn test_set_at_path() {
    let fx = Fixture::new();
    fx.run(json!({"setAtPath": {"path": "settings[\"dark mode\"]", "value": true}}));
    assert_eq!(
        fx.get("settings"),
        Some(Node::from(json!({"dark mode": true})))
    );
}

#[test]
fn test_set_uses_loop_index() {
    let fx = Fixture::new();
    fx.context.set("rows", Node::from(json!([{"done": false}, {"done": false}])));

    let row = fx.context.child_for_index(1);
    fx.interpreter.handle_event(
        &Node::from(json!({"set": {"var": "rows[$index].done", "value": true}})),
        &row,
    );

    assert_eq!(
        fx.get("rows"),
        Some(Node::from(json!([{"done": false}, {"done": true}])))
    );
}

#[test]
fn test_sequence_runs_in_order_past_failures() {
    let fx = Fixture::new();
    fx.context.set("log", Node::from(json!([])));

    fx.run(json!({"sequence": [
        {"set": {"var": "log[0]", "value": "A"}},
        {"unknownCommand": {}},
        {"set": {"var": "log[1]", "value": "B"}},
        "not a command",
        {"set": {"var": "log[2]", "value": "C"}}
    ]}));

    assert_eq!(fx.get("log"), Some(Node::from(json!(["A", "B", "C"]))));
}

#[test]
fn test_if_selects_branch() {
    let fx = Fixture::new();
    fx.run(json!({"if": {
        "condition": {"Logic.eq": [1, 1]},
        "then": {"set": {"var": "x", "value": 1}},
        "else": {"set": {"var": "x", "value": 2}}
    }}));
    assert_eq!(fx.get("x"), Some(Node::from(1)));

    fx.run(json!({"if": {
        "condition": {"Logic.eq": [1, 2]},
        "then": {"set": {"var": "x", "value": 1}},
        "else": {"set": {"var": "x", "value": 2}}
    }}));
    assert_eq!(fx.get("x"), Some(Node::from(2)));
}

#[test]
fn test_if_branch_may_be_a_list() {
    let fx = Fixture::new();
    fx.run(json!({"if": {
        "condition": true,
        "then": [
            {"set": {"var": "a", "value": 1}},
            {"set": {"var": "b", "value": 2}}
        ]
    }}));
    assert_eq!(fx.get("a"), Some(Node::from(1)));
    assert_eq!(fx.get("b"), Some(Node::from(2)));
}

#[test]
fn test_if_non_boolean_or_missing_condition_is_false() {
    let fx = Fixture::new();
    fx.run(json!({"if": {
        "condition": "yes",
        "then": {"set": {"var": "branch", "value": "then"}},
        "else": {"set": {"var": "branch", "value": "else"}}
    }}));
    assert_eq!(fx.get("branch"), Some(Node::from("else")));

    fx.run(json!({"if": {
        "then": {"set": {"var": "missing", "value": "then"}},
        "else": {"set": {"var": "missing", "value": "else"}}
    }}));
    assert_eq!(fx.get("missing"), Some(Node::from("else")));
}

#[test]
fn test_if_absent_branch_is_noop() {
    let fx = Fixture::new();
    fx.run(json!({"if": {"condition": false, "then": {"set": {"var": "x", "value": 1}}}}));
    assert_eq!(fx.get("x"), None);
    assert_eq!(fx.context.revision(), 0);
}

#[test]
fn test_navigate_and_pop() {
    let fx = Fixture::new();
    fx.context.set("target", Node::from("detail"));

    fx.run(json!({"navigate": "list"}));
    fx.run(json!({"navigate": {"var": "target"}}));
    assert_eq!(fx.navigator.stack(), vec!["list", "detail"]);

    fx.run(json!({"pop": null}));
    assert_eq!(fx.navigator.stack(), vec!["list"]);

    fx.run(json!([{"pop": {}}, {"pop": {}}]));
    assert!(fx.navigator.stack().is_empty());
    assert_eq!(fx.navigator.current_root().as_deref(), Some("home"));
}

#[test]
fn test_pop_to_root() {
    let fx = Fixture::new();
    fx.run(json!([{"navigate": "a"}, {"navigate": "b"}, {"popToRoot": null}]));
    assert!(fx.navigator.stack().is_empty());
}

#[test]
fn test_navigate_fires_on_appear() {
    let fx = Fixture::new();
    fx.interpreter.register_screen(
        Screen::new("detail").with_on_appear(Node::from(json!({"set": {"var": "seen", "value": true}}))),
    );

    fx.run(json!({"navigate": "detail"}));
    assert_eq!(fx.get("seen"), Some(Node::Bool(true)));

    fx.run(json!({"navigate": "unregistered"}));
    assert_eq!(fx.navigator.top().as_deref(), Some("unregistered"));
}

#[test]
fn test_storage_set_and_get() {
    let fx = Fixture::new();
    fx.context.set("name", Node::from("Ada"));

    fx.run(json!({"Storage.set": {"key": "profile", "value": {"name": {"var": "name"}}}}));
    assert_eq!(fx.storage.get("profile"), Some(Node::from(json!({"name": "Ada"}))));

    fx.run(json!({"set": {"var": "loaded", "value": {"Storage.get": "profile"}}}));
    assert_eq!(fx.get("loaded"), Some(Node::from(json!({"name": "Ada"}))));
}

#[test]
fn test_log_does_not_touch_context() {
    let fx = Fixture::new();
    fx.run(json!({"log": {"String.concat": ["hello ", 1]}}));
    assert_eq!(fx.context.revision(), 0);
}

#[test]
fn test_unknown_and_malformed_commands_are_ignored() {
    let fx = Fixture::new();
    fx.run(json!({"doesNotExist": {"var": "x"}}));
    fx.run(json!({"set": {"var": "a", "value": 1}, "extra": true}));
    fx.run(json!("set"));
    fx.run(json!(42));
    assert_eq!(fx.context.revision(), 0);
}

#[test]
fn test_custom_command_trait() {
    struct Increment;

    impl Command for Increment {
        fn name(&self) -> &str {
            "Test.increment"
        }

        fn execute(&self, payload: &Node, scope: &CommandScope<'_>) {
            let Some(name) = payload.as_str() else {
                return;
            };
            let current = scope.context.get(name).and_then(|n| n.as_f64()).unwrap_or(0.0);
            scope.context.set(name, Node::Number(current + 1.0));
        }
    }

    let mut fx = Fixture::new();
    fx.interpreter.commands_mut().register(Increment);

    fx.run(json!([{"Test.increment": "clicks"}, {"Test.increment": "clicks"}]));
    assert_eq!(fx.get("clicks"), Some(Node::from(2)));
}

#[test]
fn test_custom_command_closure_dispatches_nested() {
    let mut fx = Fixture::new();
    fx.interpreter
        .commands_mut()
        .register_fn("Test.twice", |payload, scope| {
            scope.handle_event(payload);
            scope.handle_event(payload);
        });

    fx.context.set("n", Node::from(0));
    fx.run(json!({"Test.twice": {"set": {"var": "n", "value": {"Math.add": [{"var": "n"}, 5]}}}}));
    assert_eq!(fx.get("n"), Some(Node::from(10)));
}
