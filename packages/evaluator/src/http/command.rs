use super::{Callbacks, HttpError, HttpRequest, HttpResponse, HttpResult, PendingRequest};
use crate::commands::{Command, CommandScope};
use crate::context::Context;
use crate::interpreter::Interpreter;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Method;
use tessera_common::{Node, NodeMap};
use tracing::{debug, warn};
use url::Url;

/// Key of the marker stored for an empty successful body: `{"noContent": true}`
pub const NO_CONTENT_KEY: &str = "noContent";

const CONTENT_TYPE: &str = "Content-Type";

/// `HttpRequest.request` with payload
/// `{url, method?, headers?, body?, var?, onSuccess?, onError?, onFinally?}`
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpRequestCommand;

impl Command for HttpRequestCommand {
    fn name(&self) -> &str {
        "HttpRequest.request"
    }

    fn execute(&self, payload: &Node, scope: &CommandScope<'_>) {
        if !matches!(payload, Node::Mapping(_)) {
            warn!(payload_type = payload.type_name(), "HttpRequest.request expects a map payload");
            return;
        }

        let callbacks = Callbacks::from_payload(payload);
        let var = match scope.evaluate_field(payload, "var") {
            Node::String(var) if !var.is_empty() => Some(var),
            _ => None,
        };

        let request = match build_request(payload, scope) {
            Ok(request) => request,
            Err(err) if err.is_silent() => {
                warn!(error = %err, "Dropping HTTP request");
                return;
            }
            Err(err) => {
                warn!(error = %err, "Failed to build HTTP request");
                let pending = PendingRequest {
                    context: scope.context.clone(),
                    callbacks,
                    var,
                };
                complete(scope.interpreter, pending, Err(err));
                return;
            }
        };

        scope.interpreter.http().dispatch(
            request,
            PendingRequest {
                context: scope.context.clone(),
                callbacks,
                var,
            },
        );
    }
}

fn build_request(payload: &Node, scope: &CommandScope<'_>) -> HttpResult<HttpRequest> {
    let url = match scope.evaluate_field(payload, "url") {
        Node::String(url) if !url.trim().is_empty() => url,
        _ => return Err(HttpError::MissingUrl),
    };
    let url = parse_url(url.trim())?;

    let method = match scope.evaluate_field(payload, "method") {
        Node::Null => "GET".to_string(),
        Node::String(method) => method.to_uppercase(),
        other => return Err(HttpError::InvalidMethod(other.display_string())),
    };
    if method.is_empty() || Method::from_bytes(method.as_bytes()).is_err() {
        return Err(HttpError::InvalidMethod(method));
    }

    let mut headers = Vec::new();
    if let Node::Mapping(map) = scope.evaluate_field(payload, "headers") {
        for (name, value) in map {
            if value.is_null() {
                continue;
            }
            let value = value.display_string();
            if HeaderName::from_bytes(name.as_bytes()).is_err()
                || HeaderValue::from_str(&value).is_err()
            {
                return Err(HttpError::InvalidHeader { name });
            }
            headers.push((name, value));
        }
    }

    let body = match scope.evaluate_field(payload, "body") {
        Node::Null => None,
        Node::String(text) => {
            default_header(&mut headers, CONTENT_TYPE, "text/plain");
            Some(text.into_bytes())
        }
        structure @ (Node::Mapping(_) | Node::Sequence(_)) => {
            let json = structure
                .to_json()
                .map_err(|e| HttpError::BodySerialization(e.to_string()))?;
            let bytes = serde_json::to_vec(&json)
                .map_err(|e| HttpError::BodySerialization(e.to_string()))?;
            default_header(&mut headers, CONTENT_TYPE, "application/json");
            Some(bytes)
        }
        other => return Err(HttpError::UnsupportedBody(other.type_name())),
    };

    Ok(HttpRequest {
        url,
        method,
        headers,
        body,
    })
}

fn parse_url(raw: &str) -> HttpResult<Url> {
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) if raw.starts_with('/') => {
            return Err(HttpError::RelativeUrl(raw.to_string()))
        }
        Err(e) => {
            return Err(HttpError::InvalidUrl {
                url: raw.to_string(),
                reason: e.to_string(),
            })
        }
    };
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(HttpError::UnsupportedScheme {
            url: raw.to_string(),
            scheme: scheme.to_string(),
        }),
    }
}

fn default_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    if !headers.iter().any(|(key, _)| key.eq_ignore_ascii_case(name)) {
        headers.push((name.to_string(), value.to_string()));
    }
}

/// Decode a response body: JSON, else UTF-8 text, else the raw bytes as a
/// sequence of numbers. An empty body becomes `{"noContent": true}`.
pub fn decode_body(body: &[u8]) -> Node {
    if body.is_empty() {
        let mut marker = NodeMap::new();
        marker.insert(NO_CONTENT_KEY.to_string(), Node::Bool(true));
        return Node::Mapping(marker);
    }
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(body) {
        return Node::from(json);
    }
    match std::str::from_utf8(body) {
        Ok(text) => Node::from(text),
        Err(_) => Node::Sequence(body.iter().map(|byte| Node::from(*byte as i64)).collect()),
    }
}

fn response_metadata(response: &HttpResponse) -> Node {
    let headers: NodeMap = response
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), Node::from(value.as_str())))
        .collect();

    let mut metadata = NodeMap::new();
    metadata.insert("status".to_string(), Node::from(response.status as i64));
    metadata.insert("headers".to_string(), Node::Mapping(headers));
    Node::Mapping(metadata)
}

fn error_payload(err: &HttpError, response: Option<&HttpResponse>) -> Node {
    let mut payload = NodeMap::new();
    payload.insert("message".to_string(), Node::from(err.to_string()));
    if let Some(response) = response {
        payload.insert("status".to_string(), Node::from(response.status as i64));
        let body = if response.body.is_empty() {
            Node::Null
        } else {
            decode_body(&response.body)
        };
        payload.insert("body".to_string(), body);
    }
    Node::Mapping(payload)
}

/// Run `f` with `name` temporarily set to `value`, then put back whatever
/// the variable held before (or remove it if it was unset)
fn with_temporary(context: &Context, name: &str, value: Node, f: impl FnOnce()) {
    let previous = context.get(name);
    context.set(name, value);
    f();
    match previous {
        Some(previous) => context.set(name, previous),
        None => {
            context.remove(name);
        }
    }
}

/// Apply a finished request on the mutation thread: store the result, then
/// fire `onSuccess` or `onError`, then `onFinally`
pub(crate) fn complete(
    interpreter: &Interpreter,
    pending: PendingRequest,
    outcome: HttpResult<HttpResponse>,
) {
    let PendingRequest {
        context,
        callbacks,
        var,
    } = pending;
    let config = interpreter.config();

    match outcome {
        Ok(response) if response.is_success() => {
            debug!(status = response.status, "HTTP request succeeded");
            let body = decode_body(&response.body);
            if let Some(var) = &var {
                if let Err(err) = interpreter.evaluator().write_path(var, body, &context) {
                    warn!(var = %var, error = %err, "Failed to store HTTP response");
                }
            }
            if let Some(on_success) = &callbacks.on_success {
                with_temporary(
                    &context,
                    &config.http_response_variable,
                    response_metadata(&response),
                    || interpreter.handle_event(on_success, &context),
                );
            }
        }
        Ok(response) => {
            let err = HttpError::Status {
                status: response.status,
            };
            debug!(status = response.status, "HTTP request failed with status");
            if let Some(on_error) = &callbacks.on_error {
                with_temporary(
                    &context,
                    &config.http_response_variable,
                    response_metadata(&response),
                    || {
                        with_temporary(
                            &context,
                            &config.http_error_variable,
                            error_payload(&err, Some(&response)),
                            || interpreter.handle_event(on_error, &context),
                        )
                    },
                );
            }
        }
        Err(err) => {
            debug!(error = %err, "HTTP request failed");
            if let Some(on_error) = &callbacks.on_error {
                with_temporary(
                    &context,
                    &config.http_error_variable,
                    error_payload(&err, None),
                    || interpreter.handle_event(on_error, &context),
                );
            }
        }
    }

    if let Some(on_finally) = &callbacks.on_finally {
        interpreter.handle_event(on_finally, &context);
    }
}
