use thiserror::Error;

/// The closed JSON-RPC error-code set this protocol uses. Any
/// handler-raised failure without one of these attached maps to
/// [`ErrorCode::ServerError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError,
}

impl ErrorCode {
    pub const fn code(self) -> i64 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::ServerError => -32000,
        }
    }
}

impl From<ErrorCode> for i64 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("invalid collector identifier: {identifier}")]
    InvalidIdentifier { identifier: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
