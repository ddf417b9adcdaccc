//! Error types for codegen-ai

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using codegen-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when calling a completion endpoint
#[derive(Error, Debug)]
pub enum Error {
    /// Network unreachable, connection reset or timeout
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("Server error: HTTP {status}: {body}")]
    Server { status: u16, body: String },

    /// Response body did not parse into an assistant message
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse classification used for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    Server,
    MalformedResponse,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Server => "server",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::Config => "config",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Create a server error from a status code and body
    pub fn server(status: u16, body: impl Into<String>) -> Self {
        Self::Server {
            status,
            body: body.into(),
        }
    }

    /// Create a malformed-response error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse(reason.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            // reqwest reports body decode failures through the same type
            Error::Transport(e) if e.is_decode() => ErrorKind::MalformedResponse,
            Error::Transport(_) => ErrorKind::Transport,
            Error::Server { .. } => ErrorKind::Server,
            Error::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Error::InvalidApiKey | Error::InvalidConfig(_) => ErrorKind::Config,
        }
    }

    /// Check if this error was a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(e) if e.is_timeout())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::MalformedResponse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_server() {
        assert_eq!(Error::server(502, "bad gateway").kind(), ErrorKind::Server);
    }

    #[test]
    fn test_kind_malformed() {
        assert_eq!(Error::malformed("no role").kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_json_error_is_malformed() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{oops")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_config_errors() {
        assert_eq!(Error::InvalidApiKey.kind(), ErrorKind::Config);
        assert_eq!(
            Error::InvalidConfig("no endpoint".into()).kind(),
            ErrorKind::Config
        );
        assert!(!Error::InvalidApiKey.is_timeout());
    }

    #[test]
    fn test_server_display() {
        let e = Error::server(500, "boom");
        assert_eq!(e.to_string(), "Server error: HTTP 500: boom");
    }
}
