/// HttpRequest.request against a scripted transport
use crate::*;
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockTransport {
    responses: Mutex<HashMap<String, HttpResult<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    fn respond(&self, url: &str, outcome: HttpResult<HttpResponse>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), outcome);
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> HttpResult<HttpResponse> {
        let outcome = self
            .responses
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .unwrap_or_else(|| Ok(HttpResponse::new(404, "")));
        self.requests.lock().unwrap().push(request);
        outcome
    }
}

struct PanickingTransport;

#[async_trait]
impl HttpTransport for PanickingTransport {
    async fn send(&self, _request: HttpRequest) -> HttpResult<HttpResponse> {
        panic!("transport bug")
    }
}

fn setup() -> (Interpreter, Context, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::default());
    let interpreter = Interpreter::builder()
        .transport(transport.clone())
        .build()
        .unwrap();
    (interpreter, Context::new(), transport)
}

fn run(interpreter: &Interpreter, context: &Context, event: serde_json::Value) {
    interpreter.handle_event(&Node::from(event), context);
}

#[tokio::test]
async fn test_success_stores_body_then_runs_callbacks() {
    let (interpreter, context, transport) = setup();
    transport.respond(
        "https://api.test/data",
        Ok(HttpResponse::new(200, r#"{"a":1}"#).with_header("content-type", "application/json")),
    );

    run(&interpreter, &context, json!({"HttpRequest.request": {
        "url": "https://api.test/data",
        "var": "r",
        "onSuccess": {"set": {"var": "done", "value": true}},
        "onFinally": {"set": {"var": "finallySawDone", "value": {"var": "done"}}}
    }}));

    assert_eq!(context.get("r"), None);
    assert_eq!(interpreter.settle().await, 1);

    assert_eq!(context.get("r"), Some(Node::from(json!({"a": 1}))));
    assert_eq!(context.get("done"), Some(Node::Bool(true)));
    assert_eq!(context.get("finallySawDone"), Some(Node::Bool(true)));
    assert_eq!(interpreter.http().in_flight(), 0);
}

#[tokio::test]
async fn test_error_status_exposes_temporary_error() {
    let (interpreter, context, transport) = setup();
    transport.respond("https://api.test/missing", Ok(HttpResponse::new(404, "not here")));

    run(&interpreter, &context, json!({"HttpRequest.request": {
        "url": "https://api.test/missing",
        "var": "r",
        "onSuccess": {"set": {"var": "succeeded", "value": true}},
        "onError": [
            {"set": {"var": "e", "value": {"var": "_httpRequestError.message"}}},
            {"set": {"var": "code", "value": {"var": "_httpRequestError.status"}}},
            {"set": {"var": "body", "value": {"var": "_httpRequestError.body"}}}
        ],
        "onFinally": {"set": {"var": "finished", "value": true}}
    }}));
    interpreter.settle().await;

    assert!(matches!(context.get("e"), Some(Node::String(message)) if !message.is_empty()));
    assert_eq!(context.get("code"), Some(Node::from(404)));
    assert_eq!(context.get("body"), Some(Node::from("not here")));
    assert_eq!(context.get("finished"), Some(Node::Bool(true)));
    assert_eq!(context.get("succeeded"), None);
    assert_eq!(context.get("r"), None);
    assert!(!context.contains("_httpRequestError"));
    assert!(!context.contains("_httpResponse"));
}

#[tokio::test]
async fn test_error_variable_restored_to_previous_value() {
    let (interpreter, context, transport) = setup();
    transport.respond(
        "https://api.test/fail",
        Err(HttpError::Transport("connection refused".to_string())),
    );
    context.set("_httpRequestError", Node::from("keep me"));

    run(&interpreter, &context, json!({"HttpRequest.request": {
        "url": "https://api.test/fail",
        "onError": {"set": {"var": "seen", "value": {"var": "_httpRequestError.message"}}}
    }}));
    interpreter.settle().await;

    assert_eq!(
        context.get("seen"),
        Some(Node::from("Transport error: connection refused"))
    );
    assert_eq!(context.get("_httpRequestError"), Some(Node::from("keep me")));
}

#[tokio::test]
async fn test_response_metadata_visible_during_success() {
    let (interpreter, context, transport) = setup();
    transport.respond(
        "https://api.test/created",
        Ok(HttpResponse::new(201, "").with_header("location", "/items/7")),
    );

    run(&interpreter, &context, json!({"HttpRequest.request": {
        "url": "https://api.test/created",
        "method": "post",
        "var": "result",
        "onSuccess": [
            {"set": {"var": "status", "value": {"var": "_httpResponse.status"}}},
            {"set": {"var": "location", "value": {"var": "_httpResponse.headers.location"}}}
        ]
    }}));
    interpreter.settle().await;

    assert_eq!(context.get("status"), Some(Node::from(201)));
    assert_eq!(context.get("location"), Some(Node::from("/items/7")));
    assert_eq!(context.get("result"), Some(Node::from(json!({"noContent": true}))));
    assert!(!context.contains("_httpResponse"));
}

#[tokio::test]
async fn test_text_body_falls_back_to_string() {
    let (interpreter, context, transport) = setup();
    transport.respond("https://api.test/text", Ok(HttpResponse::new(200, "plain words")));

    run(&interpreter, &context, json!({"HttpRequest.request": {
        "url": "https://api.test/text",
        "var": "text"
    }}));
    interpreter.settle().await;

    assert_eq!(context.get("text"), Some(Node::from("plain words")));
}

#[tokio::test]
async fn test_request_is_built_from_evaluated_fields() {
    let (interpreter, context, transport) = setup();
    context.set("base", Node::from("https://api.test"));
    context.set("token", Node::from("secret"));
    transport.respond("https://api.test/items", Ok(HttpResponse::new(200, "{}")));

    run(&interpreter, &context, json!({"HttpRequest.request": {
        "url": {"String.concat": [{"var": "base"}, "/items"]},
        "method": "put",
        "headers": {"Authorization": {"String.concat": ["Bearer ", {"var": "token"}]}, "X-Retry": 3},
        "body": {"name": "Ada", "tags": [1, 2]}
    }}));
    interpreter.settle().await;

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "PUT");
    assert_eq!(request.header("authorization"), Some("Bearer secret"));
    assert_eq!(request.header("x-retry"), Some("3"));
    assert_eq!(request.header("content-type"), Some("application/json"));

    let body: serde_json::Value = serde_json::from_slice(request.body.as_deref().unwrap()).unwrap();
    assert_eq!(body, json!({"name": "Ada", "tags": [1, 2]}));
}

#[tokio::test]
async fn test_string_body_defaults_to_text_plain() {
    let (interpreter, context, transport) = setup();

    run(&interpreter, &context, json!({"HttpRequest.request": {
        "url": "https://api.test/notes",
        "method": "POST",
        "body": "hello"
    }}));
    run(&interpreter, &context, json!({"HttpRequest.request": {
        "url": "https://api.test/notes",
        "method": "POST",
        "headers": {"Content-Type": "application/xml"},
        "body": "<a/>"
    }}));
    interpreter.settle().await;

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    let content_types: Vec<_> = requests
        .iter()
        .map(|r| r.header("content-type").map(str::to_string))
        .collect();
    assert!(content_types.contains(&Some("text/plain".to_string())));
    assert!(content_types.contains(&Some("application/xml".to_string())));
}

#[tokio::test]
async fn test_method_defaults_to_get() {
    let (interpreter, context, transport) = setup();
    run(&interpreter, &context, json!({"HttpRequest.request": {"url": "https://api.test/ping"}}));
    interpreter.settle().await;

    let requests = transport.requests();
    assert_eq!(requests[0].method, "GET");
    assert!(requests[0].body.is_none());
}

#[tokio::test]
async fn test_invalid_url_is_silent() {
    let (interpreter, context, transport) = setup();

    for url in [json!(null), json!(""), json!("not a url"), json!("http://"), json!(42)] {
        run(&interpreter, &context, json!({"HttpRequest.request": {
            "url": url,
            "onError": {"set": {"var": "error", "value": true}},
            "onFinally": {"set": {"var": "finally", "value": true}}
        }}));
    }
    interpreter.settle().await;

    assert!(transport.requests().is_empty());
    assert_eq!(interpreter.http().in_flight(), 0);
    assert_eq!(context.get("error"), None);
    assert_eq!(context.get("finally"), None);
}

#[tokio::test]
async fn test_unusable_url_runs_error_callbacks() {
    let (interpreter, context, transport) = setup();

    for (name, url) in [("relative", "/api/items"), ("ftp", "ftp://files.test/a")] {
        run(&interpreter, &context, json!({"HttpRequest.request": {
            "url": url,
            "onError": {"set": {"var": format!("{}Error", name), "value": {"var": "_httpRequestError.message"}}},
            "onFinally": {"set": {"var": format!("{}Finally", name), "value": true}}
        }}));
    }

    assert!(matches!(context.get("relativeError"), Some(Node::String(m)) if m.contains("/api/items")));
    assert_eq!(context.get("relativeFinally"), Some(Node::Bool(true)));
    assert!(matches!(context.get("ftpError"), Some(Node::String(m)) if m.contains("ftp")));
    assert_eq!(context.get("ftpFinally"), Some(Node::Bool(true)));
    assert!(transport.requests().is_empty());
    assert_eq!(interpreter.http().in_flight(), 0);
}

#[tokio::test]
async fn test_invalid_header_fails_synchronously_with_callbacks() {
    let (interpreter, context, transport) = setup();

    run(&interpreter, &context, json!({"HttpRequest.request": {
        "url": "https://api.test/items",
        "headers": {"bad header": "x"},
        "onError": {"set": {"var": "error", "value": {"var": "_httpRequestError.message"}}},
        "onFinally": {"set": {"var": "finally", "value": {"var": "error"}}}
    }}));

    // No settle needed: construction failures complete inline
    assert_eq!(context.get("error"), Some(Node::from("Invalid header 'bad header'")));
    assert_eq!(context.get("finally"), context.get("error"));
    assert!(!context.contains("_httpRequestError"));
    assert_eq!(interpreter.http().in_flight(), 0);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_unsupported_body_fails_synchronously_with_callbacks() {
    let (interpreter, context, transport) = setup();

    run(&interpreter, &context, json!({"HttpRequest.request": {
        "url": "https://api.test/items",
        "method": "POST",
        "body": 12,
        "onError": {"set": {"var": "error", "value": true}},
        "onFinally": {"set": {"var": "finally", "value": true}}
    }}));

    assert_eq!(context.get("error"), Some(Node::Bool(true)));
    assert_eq!(context.get("finally"), Some(Node::Bool(true)));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_invalid_method_fails_with_callbacks() {
    let (interpreter, context, transport) = setup();

    run(&interpreter, &context, json!({"HttpRequest.request": {
        "url": "https://api.test/items",
        "method": "GE T",
        "onError": {"set": {"var": "error", "value": true}}
    }}));

    assert_eq!(context.get("error"), Some(Node::Bool(true)));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_sequence_does_not_wait_for_request() {
    let (interpreter, context, transport) = setup();
    transport.respond("https://api.test/slow", Ok(HttpResponse::new(200, "[1]")));

    run(&interpreter, &context, json!({"sequence": [
        {"HttpRequest.request": {
            "url": "https://api.test/slow",
            "onSuccess": {"set": {"var": "order", "value": {"String.concat": [{"var": "order"}, "-response"]}}}
        }},
        {"set": {"var": "order", "value": "next"}}
    ]}));

    assert_eq!(context.get("order"), Some(Node::from("next")));
    assert_eq!(interpreter.http().in_flight(), 1);
    assert_eq!(interpreter.drain_completions(), 0);

    interpreter.settle().await;
    assert_eq!(context.get("order"), Some(Node::from("next-response")));
}

#[tokio::test]
async fn test_settle_follows_requests_started_by_callbacks() {
    let (interpreter, context, transport) = setup();
    transport.respond("https://api.test/first", Ok(HttpResponse::new(200, r#"{"next": "https://api.test/second"}"#)));
    transport.respond("https://api.test/second", Ok(HttpResponse::new(200, r#""done""#)));

    run(&interpreter, &context, json!({"HttpRequest.request": {
        "url": "https://api.test/first",
        "var": "first",
        "onSuccess": {"HttpRequest.request": {
            "url": {"var": "first.next"},
            "var": "second"
        }}
    }}));

    assert_eq!(interpreter.settle().await, 2);
    assert_eq!(context.get("second"), Some(Node::from("done")));
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn test_callbacks_run_against_the_issuing_context() {
    let (interpreter, context, transport) = setup();
    transport.respond("https://api.test/row", Ok(HttpResponse::new(200, "true")));
    context.set("rows", Node::from(json!([{"loaded": false}, {"loaded": false}])));

    let row = context.child_for_index(1);
    interpreter.handle_event(
        &Node::from(json!({"HttpRequest.request": {
            "url": "https://api.test/row",
            "var": "rows[$index].loaded"
        }})),
        &row,
    );
    interpreter.settle().await;

    assert_eq!(
        context.get("rows"),
        Some(Node::from(json!([{"loaded": false}, {"loaded": true}])))
    );
}

#[test]
fn test_without_runtime_request_fails_through_callbacks() {
    let (interpreter, context, transport) = setup();

    run(&interpreter, &context, json!({"HttpRequest.request": {
        "url": "https://api.test/offline",
        "onError": {"set": {"var": "error", "value": {"var": "_httpRequestError.message"}}},
        "onFinally": {"set": {"var": "finally", "value": true}}
    }}));
    assert_eq!(interpreter.drain_completions(), 1);

    assert_eq!(
        context.get("error"),
        Some(Node::from("No async runtime available to send the request"))
    );
    assert_eq!(context.get("finally"), Some(Node::Bool(true)));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_panicking_transport_still_completes() {
    let interpreter = Interpreter::builder()
        .transport(Arc::new(PanickingTransport))
        .build()
        .unwrap();
    let context = Context::new();

    run(&interpreter, &context, json!({"HttpRequest.request": {
        "url": "https://api.test/crash",
        "onError": {"set": {"var": "error", "value": {"var": "_httpRequestError.message"}}},
        "onFinally": {"set": {"var": "finished", "value": true}}
    }}));

    assert_eq!(interpreter.settle().await, 1);
    assert!(matches!(context.get("error"), Some(Node::String(m)) if m.starts_with("Transport error")));
    assert_eq!(context.get("finished"), Some(Node::Bool(true)));
    assert_eq!(interpreter.http().in_flight(), 0);
}
