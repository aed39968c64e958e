use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ProtocolError, JSONRPC_VERSION};

/// A JSON-RPC `id`: either an integer or a string, per the wire spec.
/// Untagged so both shapes round-trip without a wrapper object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(u64),
    String(String),
}

impl From<u64> for Id {
    fn from(n: u64) -> Self {
        Id::Number(n)
    }
}

impl Id {
    /// Extracts an `id` from a raw JSON value without requiring the rest
    /// of the envelope to be well-formed. Used to echo the request's
    /// `id` in an invalid-request response even when the envelope fails
    /// to fully decode into a [`Request`].
    pub fn from_value(value: &Value) -> Option<Id> {
        match value.get("id")? {
            Value::Number(n) => n.as_u64().map(Id::Number),
            Value::String(s) => Some(Id::String(s.clone())),
            _ => None,
        }
    }
}

/// A request envelope, sent in both directions (host -> plugin calls the
/// method surface; the dispatcher never initiates requests of its own).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    pub id: Id,
}

impl Request {
    pub fn new(method: impl Into<String>, params: Value, id: impl Into<Id>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: id.into(),
        }
    }

    /// Validates the `jsonrpc == "2.0"`, `method` non-empty, `id` present
    /// shape required of every request per the wire envelope rule,
    /// against the *raw* decoded JSON rather than an already-built
    /// `Request`. This distinction matters: by the time a `Request` value
    /// exists, serde has already required `jsonrpc`/`method`/`id` to be
    /// present, so a missing field can never reach this check through
    /// `Request` itself — it would already have failed as a parse error.
    /// Callers must run this against the intermediate `Value` *before*
    /// attempting `serde_json::from_value::<Request>`, so a
    /// syntactically-valid-JSON-but-incomplete envelope is correctly
    /// classified as invalid-request (-32600) rather than parse-error
    /// (-32700).
    pub fn validate_envelope(value: &Value) -> Result<(), ProtocolError> {
        match value.get("jsonrpc").and_then(Value::as_str) {
            Some(version) if version == JSONRPC_VERSION => {}
            Some(other) => {
                return Err(ProtocolError::InvalidRequest {
                    reason: format!("unsupported jsonrpc version: {other}"),
                })
            }
            None => {
                return Err(ProtocolError::InvalidRequest {
                    reason: "missing jsonrpc".to_string(),
                })
            }
        }
        match value.get("method").and_then(Value::as_str) {
            Some(method) if !method.is_empty() => {}
            _ => {
                return Err(ProtocolError::InvalidRequest {
                    reason: "missing method".to_string(),
                })
            }
        }
        match value.get("id") {
            Some(Value::Number(_)) | Some(Value::String(_)) => {}
            _ => {
                return Err(ProtocolError::InvalidRequest {
                    reason: "missing id".to_string(),
                })
            }
        }
        Ok(())
    }
}

/// A response envelope: exactly one of `result`/`error` is populated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Response {
    pub fn success(id: Id, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Id, error: ErrorObject) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// A response to a request that could not even be decoded. The wire
    /// envelope rule fixes `id` to `0` in this case.
    pub fn parse_error() -> Self {
        Self::failure(
            Id::Number(0),
            ErrorObject {
                code: crate::ErrorCode::ParseError.code(),
                message: "Parse error".to_string(),
                data: None,
            },
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// An envelope as received off the wire, before it is known to be a
/// request or a response. The dispatcher only ever sees requests; the
/// supervisor only ever sees responses, but both sides parse raw lines
/// through `serde_json::from_str` directly into the concrete type they
/// expect — this type exists for callers (tests, fixtures) that need to
/// inspect a line without committing to a direction up front.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    Request(Request),
    Response(Response),
}
