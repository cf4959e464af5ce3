use thiserror::Error;

/// Common error type shared by the tessera crates
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// A node that has no JSON representation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("Number {0} cannot be represented in JSON")]
    NonFiniteNumber(f64),
}

impl From<String> for CommonError {
    fn from(s: String) -> Self {
        CommonError::Generic(s)
    }
}

impl From<&str> for CommonError {
    fn from(s: &str) -> Self {
        CommonError::Generic(s.to_string())
    }
}
