use serde::{Deserialize, Serialize};

/// Tunables for one interpreter session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Upper bound on passes of `Context::resolve_expressions`
    #[serde(default = "default_resolve_iteration_cap")]
    pub resolve_iteration_cap: usize,

    /// Token replaced by the current loop index inside `var` paths
    #[serde(default = "default_index_placeholder")]
    pub index_placeholder: String,

    /// Temporary variable holding the error while `onError` runs
    #[serde(default = "default_http_error_variable")]
    pub http_error_variable: String,

    /// Temporary variable holding status and headers while HTTP callbacks run
    #[serde(default = "default_http_response_variable")]
    pub http_response_variable: String,

    /// Request timeout handed to the HTTP transport
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_resolve_iteration_cap() -> usize {
    10
}

fn default_index_placeholder() -> String {
    "$index".to_string()
}

fn default_http_error_variable() -> String {
    "_httpRequestError".to_string()
}

fn default_http_response_variable() -> String {
    "_httpResponse".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            resolve_iteration_cap: default_resolve_iteration_cap(),
            index_placeholder: default_index_placeholder(),
            http_error_variable: default_http_error_variable(),
            http_response_variable: default_http_response_variable(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}
