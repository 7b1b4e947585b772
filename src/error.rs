// ===============================
// src/error.rs
// ===============================
use hyper::StatusCode;
use thiserror::Error;

/// Startup configuration errors. Any of these stops the process before bind.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {key}")]
    Missing { key: &'static str },

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Caller-input errors from the webhook gate (4xx, never retried).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("Invalid JSON")]
    MalformedPayload,

    #[error("Invalid secret")]
    Unauthorized,

    #[error("Invalid action")]
    InvalidAction,

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: &'static str },
}

impl GateError {
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::Unauthorized => StatusCode::FORBIDDEN,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GateError::MalformedPayload => "malformed",
            GateError::Unauthorized => "unauthorized",
            GateError::InvalidAction => "invalid_action",
            GateError::MissingField(_) => "missing_field",
            GateError::InvalidField { .. } => "invalid_field",
        }
    }
}

/// Order submission errors (5xx). Never retried: the order endpoint has no
/// idempotency key, a blind resend can double the position.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("exchange rejected order (code {code}): {message}")]
    ExchangeRejected { code: i64, message: String },

    #[error("unexpected response shape: {0}")]
    UnexpectedResponseShape(String),

    #[error("failed to encode order body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl OrderError {
    pub fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderError::Transport(_) => "transport_error",
            OrderError::ExchangeRejected { .. } => "exchange_rejected",
            OrderError::UnexpectedResponseShape(_) => "unexpected_shape",
            OrderError::Encode(_) => "encode_error",
        }
    }

    /// Text placed in the `detail` field returned to the webhook sender.
    pub fn detail(&self) -> String {
        format!("Order failed: {self}")
    }
}

impl From<reqwest::Error> for OrderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            OrderError::Transport(format!("timeout: {e}"))
        } else {
            OrderError::Transport(e.to_string())
        }
    }
}
