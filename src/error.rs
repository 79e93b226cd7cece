//! Crate-wide error type.
//!
//! One variant per concern: configuration, auth, upstream API, session
//! management, wire protocol, and a catch-all internal bucket.

use serde::Serialize;
use thiserror::Error;

/// Convenient result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    #[inline]
    pub fn config<S: Into<String>>(msg: S) -> Self {
        GatewayError::Config(msg.into())
    }

    #[inline]
    pub fn auth<S: Into<String>>(msg: S) -> Self {
        GatewayError::Auth(msg.into())
    }

    #[inline]
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        GatewayError::Validation(msg.into())
    }

    #[inline]
    pub fn session<S: Into<String>>(msg: S) -> Self {
        GatewayError::Session(msg.into())
    }

    #[inline]
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        GatewayError::Protocol(msg.into())
    }

    #[inline]
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        GatewayError::Internal(msg.into())
    }
}

/// The finite classification taxonomy upstream failures fall into
///. Tool handlers surface this inside the
/// `is_error` result envelope; it never becomes a transport-level
/// JSON-RPC error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Permission,
    RateLimit,
    Timeout,
    Conflict,
    ServerError,
}

impl ErrorKind {
    /// Machine-readable code surfaced to the MCP client.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Permission => "PERMISSION_DENIED",
            ErrorKind::RateLimit => "RATE_LIMIT_EXCEEDED",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::ServerError => "SERVER_ERROR",
        }
    }

    /// Whether this kind is retried by the upstream client before being surfaced.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::RateLimit | ErrorKind::Timeout | ErrorKind::ServerError)
    }

    /// Classify an HTTP status code into one of the error kinds above.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => ErrorKind::Validation,
            404 => ErrorKind::NotFound,
            401 | 403 => ErrorKind::Permission,
            409 => ErrorKind::Conflict,
            429 => ErrorKind::RateLimit,
            500..=599 => ErrorKind::ServerError,
            _ => ErrorKind::ServerError,
        }
    }

    /// Fallback classification by substring match, used only when the
    /// upstream layer elides a status code.
    pub fn from_message(msg: &str) -> Self {
        let lower = msg.to_ascii_lowercase();
        if lower.contains("rate limit") || lower.contains("too many requests") || lower.contains("429") {
            ErrorKind::RateLimit
        } else if lower.contains("timeout")
            || lower.contains("connection refused")
            || lower.contains("connection reset")
            || lower.contains("temporary failure")
            || lower.contains("server unavailable")
            || lower.contains("502")
            || lower.contains("503")
            || lower.contains("504")
        {
            ErrorKind::Timeout
        } else {
            ErrorKind::ServerError
        }
    }
}

const MAX_BODY_EXCERPT: usize = 1000;

/// An error returned by the upstream API client, carrying enough
/// structure for the tool layer to build an `is_error` envelope
#[derive(Debug, Error)]
#[error("{}: {message}", kind.code())]
pub struct UpstreamError {
    pub kind: ErrorKind,
    pub message: String,
    pub status: Option<u16>,
    pub body: Option<String>,
}

impl UpstreamError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), status: None, body: None }
    }

    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::from_status(status),
            message: format!("upstream returned status {status}"),
            status: Some(status),
            body: Some(truncate(body.into())),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = ErrorKind::from_message(&message);
        Self { kind, message, status: None, body: None }
    }

    /// The message surfaced as a tool result's error text.
    pub fn display_message(&self) -> String {
        match (&self.status, &self.body) {
            (Some(status), Some(body)) if !body.is_empty() => {
                format!("{}: {} [status {status}] {body}", self.kind.code(), self.message)
            }
            (Some(status), _) => format!("{}: {} [status {status}]", self.kind.code(), self.message),
            _ => format!("{}: {}", self.kind.code(), self.message),
        }
    }
}

fn truncate(body: String) -> String {
    if body.len() <= MAX_BODY_EXCERPT {
        body
    } else {
        let mut truncated: String = body.chars().take(MAX_BODY_EXCERPT).collect();
        truncated.push_str("...(truncated)");
        truncated
    }
}
