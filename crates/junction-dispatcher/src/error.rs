use thiserror::Error;

/// An error raised by a user handler. Carries an optional numeric
/// JSON-RPC error code; when absent, the dispatcher maps the failure to
/// `server-error` (-32000) and uses `message` as the error text.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
    pub code: Option<i64>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: i64) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }
}

/// Failures in the dispatcher's own run loop, distinct from
/// [`HandlerError`]: these stop the loop rather than produce an error
/// envelope, since they mean the stdio transport itself is broken.
#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("failed to read request line: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to write response line: {0}")]
    Write(#[source] std::io::Error),
}
