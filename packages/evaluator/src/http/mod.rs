//! # HTTP
//!
//! The `HttpRequest.request` command and the machinery behind it.
//!
//! A request moves through
//! `Building -> {Failed | Sent}`, then `Sent -> {Success | Error} -> Finally`.
//!
//! - Building fails silently (no callbacks) when the url is missing or
//!   malformed. Any other building failure (relative or non-http url,
//!   method, header, body) runs `onError` then `onFinally` right away,
//!   without touching the network.
//! - Sent requests run on the tokio runtime through an [`HttpTransport`].
//!   Their completions are queued on a channel and only applied when the
//!   interpreter drains them, so callbacks run on the same thread as every
//!   other command.

mod command;
mod dispatcher;
mod transport;

pub(crate) use command::complete;
pub use command::{decode_body, HttpRequestCommand, NO_CONTENT_KEY};
pub use dispatcher::HttpDispatcher;
pub(crate) use dispatcher::{Callbacks, PendingRequest};
pub use transport::{HttpTransport, ReqwestTransport};

use crate::commands::CommandRegistry;
use thiserror::Error;
use url::Url;

/// A fully built request, ready for a transport
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: Url,
    /// Uppercased method name
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// First header named `name`, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// What a transport hands back for any response that arrived, whatever its status
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Status in `200..=299`
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HttpError {
    #[error("Request has no url")]
    MissingUrl,

    #[error("Invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Relative url '{0}' has no base to resolve against")]
    RelativeUrl(String),

    #[error("Unsupported url scheme '{scheme}' in '{url}'")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("Invalid HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("Invalid header '{name}'")]
    InvalidHeader { name: String },

    #[error("Unsupported request body of type {0}")]
    UnsupportedBody(&'static str),

    #[error("Failed to serialize request body: {0}")]
    BodySerialization(String),

    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("No async runtime available to send the request")]
    NoRuntime,
}

impl HttpError {
    /// Building failures that drop the request without running any callback:
    /// a missing url, or one that does not parse at all
    pub fn is_silent(&self) -> bool {
        matches!(self, HttpError::MissingUrl | HttpError::InvalidUrl { .. })
    }
}

pub type HttpResult<T> = Result<T, HttpError>;

pub(crate) fn register(registry: &mut CommandRegistry) {
    registry.register(HttpRequestCommand);
}
