use std::collections::HashMap;
use std::future::Future;
use std::io::Write as _;
use std::sync::Arc;
use std::time::Instant;

use junction_protocol::{CollectorMetadata, ErrorCode, ErrorObject, Id, Method, Request, Response};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};

use crate::handler::{box_handler, BoxedHandler};
use crate::{DispatcherError, HandlerError};

struct Inner {
    metadata: CollectorMetadata,
    handlers: HashMap<Method, BoxedHandler>,
    current_config: Mutex<Option<Value>>,
    started_at: Instant,
}

/// Builds a [`PluginServer`] by registering one optional async handler
/// per method. Methods left unregistered fall back to the defaults
/// documented on each `on_*` method; `getMetadata` and `healthCheck` have
/// no handler slot since their responses are wholly determined by the
/// metadata record and the dispatcher's own start time.
pub struct PluginServerBuilder {
    metadata: CollectorMetadata,
    handlers: HashMap<Method, BoxedHandler>,
}

impl PluginServerBuilder {
    pub fn new(metadata: CollectorMetadata) -> Self {
        Self {
            metadata,
            handlers: HashMap::new(),
        }
    }

    fn register<F, Fut>(mut self, method: Method, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        self.handlers.insert(method, box_handler(handler));
        self
    }

    /// Invoked with the incoming `configure` params. Runs in addition to
    /// the dispatcher always memoizing those params as the current
    /// configuration; absent a handler, `configure` returns
    /// `{"success": true}`.
    pub fn on_configure<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        self.register(Method::Configure, handler)
    }

    /// Invoked with the current configuration (not the request params).
    /// Absent a handler, `fetchSensors` returns `{"sensors": []}` and
    /// `fetchSelectedSensors`'s automatic fallback has nothing to filter.
    pub fn on_fetch_sensors<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        self.register(Method::FetchSensors, handler)
    }

    /// Invoked with the request params (`{"sensorIds": [...]}`). Absent a
    /// handler, falls back to calling `fetchSensors` and filtering its
    /// result down to the requested `uniqueSensorKey`s, preserving order.
    pub fn on_fetch_selected_sensors<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        self.register(Method::FetchSelectedSensors, handler)
    }

    /// Absent a handler, `testConnection` returns `{"success": true}`.
    pub fn on_test_connection<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        self.register(Method::TestConnection, handler)
    }

    /// Absent a handler, `startSession` returns `{"success": true}`.
    pub fn on_start_session<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        self.register(Method::StartSession, handler)
    }

    /// Absent a handler, `stopSession` returns `{"success": true}`.
    pub fn on_stop_session<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        self.register(Method::StopSession, handler)
    }

    pub fn build(self) -> PluginServer {
        PluginServer {
            inner: Arc::new(Inner {
                metadata: self.metadata,
                handlers: self.handlers,
                current_config: Mutex::new(None),
                started_at: Instant::now(),
            }),
        }
    }
}

/// Reads framed JSON-RPC requests from standard input and writes framed
/// responses to standard output until standard input closes. Emits the
/// readiness line on standard error exactly once, before the first
/// response.
pub struct PluginServer {
    inner: Arc<Inner>,
}

impl PluginServer {
    fn emit_readiness(&self) {
        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "[plugin] {} ready", self.inner.metadata.display_name);
        let _ = stderr.flush();
    }

    /// Runs the dispatcher loop to completion. Returns once standard
    /// input is closed; only a broken stdio transport (not a handler
    /// failure, which always becomes an error envelope) causes an `Err`.
    pub async fn run(self) -> Result<(), DispatcherError> {
        self.emit_readiness();

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let writer = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(line) = rx.recv().await {
                if stdout.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if stdout.write_all(b"\n").await.is_err() {
                    break;
                }
                if stdout.flush().await.is_err() {
                    break;
                }
            }
        });

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut handler_tasks = Vec::new();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => return Err(DispatcherError::Read(err)),
            };
            if line.trim().is_empty() {
                continue;
            }
            let inner = Arc::clone(&self.inner);
            let tx = tx.clone();
            handler_tasks.push(tokio::spawn(async move {
                let response = handle_line(&inner, &line).await;
                if let Ok(serialized) = serde_json::to_string(&response) {
                    let _ = tx.send(serialized);
                }
            }));
        }
        drop(tx);
        for task in handler_tasks {
            let _ = task.await;
        }
        let _ = writer.await;
        Ok(())
    }
}

/// Decodes and dispatches one request line. Any structurally-valid-but-
/// incomplete envelope (missing `jsonrpc`/`method`/`id`) is caught against
/// the raw `Value` *before* committing to `Request`, since by the time a
/// `Request` exists serde has already required those fields — letting it
/// fail there would misclassify the envelope as a parse error instead of
/// invalid-request. Only genuinely unparseable JSON reaches `parse_error`.
async fn handle_line(inner: &Arc<Inner>, line: &str) -> Response {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(%err, "failed to parse request line as JSON");
            return Response::parse_error();
        }
    };

    if let Err(err) = Request::validate_envelope(&value) {
        return Response::failure(
            Id::from_value(&value).unwrap_or(Id::Number(0)),
            ErrorObject {
                code: ErrorCode::InvalidRequest.code(),
                message: err.to_string(),
                data: None,
            },
        );
    }

    let request: Request = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(err) => {
            tracing::debug!(%err, "envelope shape passed validation but failed to decode");
            return Response::parse_error();
        }
    };

    let method = match request.method.parse::<Method>() {
        Ok(method) => method,
        Err(unknown) => {
            return Response::failure(
                request.id,
                ErrorObject {
                    code: ErrorCode::MethodNotFound.code(),
                    message: format!("Method not found: {}", unknown.0),
                    data: None,
                },
            );
        }
    };

    // The handler call is run on its own task so a panicking user handler
    // can never take this request's response down with it: `JoinError`
    // is caught here and mapped to a server-error envelope instead of
    // propagating out and leaving this request's `id` unanswered.
    let dispatch_inner = Arc::clone(inner);
    let params = request.params.clone();
    match tokio::spawn(async move { dispatch(&dispatch_inner, method, params).await }).await {
        Ok(Ok(result)) => Response::success(request.id, result),
        Ok(Err(err)) => Response::failure(
            request.id,
            ErrorObject {
                code: err.code.unwrap_or(ErrorCode::ServerError.code()),
                message: err.message,
                data: None,
            },
        ),
        Err(join_err) => {
            tracing::warn!(%join_err, method = method.as_str(), "handler panicked");
            Response::failure(
                request.id,
                ErrorObject {
                    code: ErrorCode::ServerError.code(),
                    message: format!("handler panicked: {join_err}"),
                    data: None,
                },
            )
        }
    }
}

async fn dispatch(inner: &Arc<Inner>, method: Method, params: Value) -> Result<Value, HandlerError> {
    match method {
        Method::GetMetadata => {
            serde_json::to_value(&inner.metadata).map_err(|err| HandlerError::new(err.to_string()))
        }
        Method::Configure => {
            *inner.current_config.lock().await = Some(params.clone());
            call_or_default(inner, Method::Configure, params, || serde_json::json!({"success": true})).await
        }
        Method::TestConnection | Method::StartSession | Method::StopSession => {
            call_or_default(inner, method, params, || serde_json::json!({"success": true})).await
        }
        Method::FetchSensors => {
            match inner.handlers.get(&Method::FetchSensors) {
                Some(handler) => {
                    let config = current_config(inner).await;
                    handler(config).await
                }
                None => Ok(serde_json::json!({"sensors": []})),
            }
        }
        Method::FetchSelectedSensors => match inner.handlers.get(&Method::FetchSelectedSensors) {
            Some(handler) => handler(params).await,
            None => fetch_selected_fallback(inner, params).await,
        },
        Method::HealthCheck => Ok(serde_json::json!({
            "healthy": true,
            "uptime": inner.started_at.elapsed().as_secs(),
        })),
    }
}

async fn call_or_default(
    inner: &Arc<Inner>,
    method: Method,
    params: Value,
    default: impl FnOnce() -> Value,
) -> Result<Value, HandlerError> {
    match inner.handlers.get(&method) {
        Some(handler) => handler(params).await,
        None => Ok(default()),
    }
}

async fn current_config(inner: &Arc<Inner>) -> Value {
    inner.current_config.lock().await.clone().unwrap_or(Value::Null)
}

async fn fetch_selected_fallback(inner: &Arc<Inner>, params: Value) -> Result<Value, HandlerError> {
    let requested: Vec<String> = params
        .get("sensorIds")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(|id| id.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    let full = match inner.handlers.get(&Method::FetchSensors) {
        Some(handler) => {
            let config = current_config(inner).await;
            handler(config).await?
        }
        None => serde_json::json!({"sensors": []}),
    };

    let sensors = full.get("sensors").and_then(Value::as_array).cloned().unwrap_or_default();
    let filtered: Vec<Value> = sensors
        .into_iter()
        .filter(|sensor| {
            sensor
                .get("uniqueSensorKey")
                .and_then(Value::as_str)
                .is_some_and(|key| requested.iter().any(|id| id == key))
        })
        .collect();

    Ok(serde_json::json!({"sensors": filtered}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use junction_protocol::{FieldRequirement, Id};

    fn metadata() -> CollectorMetadata {
        CollectorMetadata {
            collector_name: "acme.weather-station".to_string(),
            display_name: "Weather Station".to_string(),
            description: "Reports local weather".to_string(),
            category: "weather".to_string(),
            emoji: "\u{1f326}".to_string(),
            field_requirements: FieldRequirement::default(),
            default_name: "Weather Station".to_string(),
            default_url: None,
            default_poll_rate_ms: 60_000,
            default_send_rate_ms: 60_000,
            setup_instructions: vec![],
            supports_persistent_session: None,
            required_service_type: None,
        }
    }

    #[tokio::test]
    async fn get_metadata_round_trips() {
        let server = PluginServerBuilder::new(metadata()).build();
        let response = dispatch(&server.inner, Method::GetMetadata, Value::Null).await.unwrap();
        let expected = serde_json::to_value(&metadata()).unwrap();
        assert_eq!(response, expected);
    }

    #[tokio::test]
    async fn unregistered_test_connection_defaults_to_success() {
        let server = PluginServerBuilder::new(metadata()).build();
        let response = dispatch(&server.inner, Method::TestConnection, Value::Null).await.unwrap();
        assert_eq!(response, serde_json::json!({"success": true}));
    }

    #[tokio::test]
    async fn health_check_reports_uptime() {
        let server = PluginServerBuilder::new(metadata()).build();
        let response = dispatch(&server.inner, Method::HealthCheck, Value::Null).await.unwrap();
        assert_eq!(response["healthy"], serde_json::json!(true));
        assert!(response["uptime"].is_number());
    }

    #[tokio::test]
    async fn fetch_selected_sensors_falls_back_to_filtering_fetch_sensors() {
        let server = PluginServerBuilder::new(metadata())
            .on_fetch_sensors(|_config| async move {
                Ok(serde_json::json!({
                    "sensors": [
                        {"uniqueSensorKey": "a", "name": "A", "value": "1", "unit": "", "category": "", "decimalPlaces": 0, "sensorType": "Numeric", "componentName": "", "sensorTag": ""},
                        {"uniqueSensorKey": "b", "name": "B", "value": "2", "unit": "", "category": "", "decimalPlaces": 0, "sensorType": "Numeric", "componentName": "", "sensorTag": ""},
                    ]
                }))
            })
            .build();

        let response = dispatch(
            &server.inner,
            Method::FetchSelectedSensors,
            serde_json::json!({"sensorIds": ["a"]}),
        )
        .await
        .unwrap();

        let sensors = response["sensors"].as_array().unwrap();
        assert_eq!(sensors.len(), 1);
        assert_eq!(sensors[0]["uniqueSensorKey"], serde_json::json!("a"));
    }

    #[tokio::test]
    async fn configure_is_memoized_even_without_a_handler() {
        let server = PluginServerBuilder::new(metadata()).build();
        let params = serde_json::json!({"collectorId": 42});
        let response = dispatch(&server.inner, Method::Configure, params.clone()).await.unwrap();
        assert_eq!(response, serde_json::json!({"success": true}));
        assert_eq!(current_config(&server.inner).await, params);
    }

    #[tokio::test]
    async fn unknown_method_in_request_maps_to_method_not_found() {
        let request: Request = serde_json::from_str(
            r#"{"jsonrpc":"2.0","method":"unknownMethod","params":{},"id":7}"#,
        )
        .unwrap();
        assert!("unknownMethod".parse::<Method>().is_err());
        assert_eq!(request.id, Id::Number(7));
    }

    #[tokio::test]
    async fn unparseable_json_yields_parse_error_with_id_zero() {
        let server = PluginServerBuilder::new(metadata()).build();
        let response = handle_line(&server.inner, "not valid json").await;
        assert_eq!(response.id, Id::Number(0));
        let error = response.error.expect("parse errors carry an error object");
        assert_eq!(error.code, ErrorCode::ParseError.code());
        assert_eq!(error.message, "Parse error");
    }

    #[tokio::test]
    async fn envelope_missing_method_is_invalid_request_not_parse_error() {
        let server = PluginServerBuilder::new(metadata()).build();
        let response = handle_line(&server.inner, r#"{"jsonrpc":"2.0","params":{},"id":9}"#).await;
        assert_eq!(response.id, Id::Number(9), "id from the envelope is still echoed back");
        let error = response.error.expect("invalid envelopes carry an error object");
        assert_eq!(error.code, ErrorCode::InvalidRequest.code());
    }

    #[tokio::test]
    async fn envelope_missing_id_is_invalid_request_with_id_zero() {
        let server = PluginServerBuilder::new(metadata()).build();
        let response = handle_line(&server.inner, r#"{"jsonrpc":"2.0","method":"getMetadata","params":{}}"#).await;
        assert_eq!(response.id, Id::Number(0), "no id was present to echo back");
        let error = response.error.expect("invalid envelopes carry an error object");
        assert_eq!(error.code, ErrorCode::InvalidRequest.code());
    }

    #[tokio::test]
    async fn envelope_with_wrong_jsonrpc_version_is_invalid_request() {
        let server = PluginServerBuilder::new(metadata()).build();
        let response = handle_line(
            &server.inner,
            r#"{"jsonrpc":"1.0","method":"getMetadata","params":{},"id":3}"#,
        )
        .await;
        assert_eq!(response.id, Id::Number(3));
        let error = response.error.expect("invalid envelopes carry an error object");
        assert_eq!(error.code, ErrorCode::InvalidRequest.code());
    }

    #[tokio::test]
    async fn a_panicking_handler_still_yields_exactly_one_error_response() {
        let server = PluginServerBuilder::new(metadata())
            .on_fetch_sensors(|_config| async move { panic!("boom") })
            .build();
        let response = handle_line(
            &server.inner,
            r#"{"jsonrpc":"2.0","method":"fetchSensors","params":{},"id":11}"#,
        )
        .await;
        assert_eq!(response.id, Id::Number(11));
        let error = response.error.expect("a panicking handler still produces an error envelope");
        assert_eq!(error.code, ErrorCode::ServerError.code());
    }
}
