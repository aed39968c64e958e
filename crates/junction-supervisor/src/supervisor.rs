use std::collections::{HashMap, VecDeque};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use junction_protocol::{CollectorMetadata, ConfigureParams, Method, Request, SensorRecord};
use serde_json::Value;
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot, Mutex, Notify};
use tokio::task::JoinHandle;

use crate::options::{StdioLaunchConfig, SupervisorCallbacks, SupervisorOptions};
use crate::transport::{self, LogBuffer, PendingMap};
use crate::SupervisorError;

/// How long `stop()` waits for the monitor task to kill the child and
/// for its reader/writer/stderr tasks to unwind before giving up and
/// returning anyway. `stop()` still takes effect immediately either way
/// (the `stopped` flag is set and pending calls rejected synchronously);
/// this bound only governs how long the caller waits for the
/// kill-and-wait sequence to actually finish.
const STOP_GRACE_PERIOD: Duration = Duration::from_secs(5);

struct Multiplexer {
    stdin_tx: mpsc::UnboundedSender<String>,
    pending: PendingMap,
}

struct State {
    multiplexer: Option<Multiplexer>,
    stopped: bool,
    restart_count: u32,
    last_configure: Option<Value>,
}

struct Inner {
    launch: Mutex<StdioLaunchConfig>,
    options: SupervisorOptions,
    callbacks: SupervisorCallbacks,
    state: Mutex<State>,
    logs: LogBuffer,
    next_id: AtomicU64,
    stop_notify: Notify,
    child: Arc<Mutex<Option<Child>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// The task running `monitor()`, tracked separately from `tasks` so
    /// `stop()` can await its completion directly instead of merely
    /// signalling it and returning.
    monitor_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(mut handle) = self.monitor_handle.try_lock() {
            if let Some(handle) = handle.take() {
                handle.abort();
            }
        }
        if let Ok(tasks) = self.tasks.try_lock() {
            for handle in tasks.iter() {
                handle.abort();
            }
        }
        if let Ok(mut guard) = self.child.try_lock() {
            if let Some(mut child) = guard.take() {
                let _ = child.start_kill();
            }
        }
    }
}

/// Owns one plugin child process end to end: spawning, request
/// correlation, the readiness handshake, crash-triggered restart with
/// configuration replay, and explicit shutdown. Cheaply `Clone`-able —
/// every clone shares the same underlying child and state.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl Supervisor {
    /// Spawns the plugin and waits for its readiness handshake before
    /// returning. On success, a background task continues to own the
    /// child process for the supervisor's lifetime, restarting it on
    /// unexpected exit per `options`.
    pub async fn start(
        launch: StdioLaunchConfig,
        options: SupervisorOptions,
        callbacks: SupervisorCallbacks,
    ) -> Result<Self, SupervisorError> {
        let inner = Arc::new(Inner {
            launch: Mutex::new(launch),
            options,
            callbacks,
            state: Mutex::new(State {
                multiplexer: None,
                stopped: false,
                restart_count: 0,
                last_configure: None,
            }),
            logs: Arc::new(Mutex::new(VecDeque::new())),
            next_id: AtomicU64::new(1),
            stop_notify: Notify::new(),
            child: Arc::new(Mutex::new(None)),
            tasks: Mutex::new(Vec::new()),
            monitor_handle: Mutex::new(None),
        });

        let multiplexer = spawn_one(&inner).await?;
        inner.state.lock().await.multiplexer = Some(multiplexer);

        let monitor_handle = tokio::spawn(monitor(Arc::clone(&inner)));
        *inner.monitor_handle.lock().await = Some(monitor_handle);

        Ok(Self { inner })
    }

    pub async fn get_metadata(&self) -> Result<CollectorMetadata, SupervisorError> {
        let value = send(&self.inner, Method::GetMetadata, Value::Null).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Sends `configure` and memoizes the parameters so they can be
    /// replayed on the new child after a restart.
    pub async fn configure(&self, params: ConfigureParams) -> Result<Value, SupervisorError> {
        let value = serde_json::to_value(&params)?;
        let result = send(&self.inner, Method::Configure, value.clone()).await?;
        self.inner.state.lock().await.last_configure = Some(value);
        Ok(result)
    }

    pub async fn test_connection(&self, params: Value) -> Result<Value, SupervisorError> {
        send(&self.inner, Method::TestConnection, params).await
    }

    pub async fn fetch_sensors(&self) -> Result<Vec<SensorRecord>, SupervisorError> {
        let value = send(&self.inner, Method::FetchSensors, Value::Null).await?;
        extract_sensors(value)
    }

    pub async fn fetch_selected_sensors(&self, sensor_ids: Vec<String>) -> Result<Vec<SensorRecord>, SupervisorError> {
        let params = serde_json::json!({ "sensorIds": sensor_ids });
        let value = send(&self.inner, Method::FetchSelectedSensors, params).await?;
        extract_sensors(value)
    }

    pub async fn start_session(&self, params: Value) -> Result<Value, SupervisorError> {
        send(&self.inner, Method::StartSession, params).await
    }

    pub async fn stop_session(&self, params: Value) -> Result<Value, SupervisorError> {
        send(&self.inner, Method::StopSession, params).await
    }

    pub async fn health_check(&self) -> Result<Value, SupervisorError> {
        send(&self.inner, Method::HealthCheck, Value::Null).await
    }

    /// Calls any of the eight known methods by name and returns the raw
    /// result. The typed wrappers above are the primary surface; this is
    /// an escape hatch for callers (tests, introspection tooling) that
    /// want the unshaped response.
    pub async fn call(&self, method: Method, params: Value) -> Result<Value, SupervisorError> {
        send(&self.inner, method, params).await
    }

    /// Returns a snapshot of the in-memory stderr ring buffer.
    pub async fn get_logs(&self) -> Vec<String> {
        self.inner.logs.lock().await.iter().cloned().collect()
    }

    /// Inhibits restart, cancels pending requests, closes the child's
    /// stdin, and kills the process, waiting briefly (up to
    /// `STOP_GRACE_PERIOD`) for the monitor task to actually finish the
    /// kill-and-wait sequence before returning. Every `send`-based call
    /// made after this resolves rejects with `SupervisorError::NotRunning`
    /// regardless of whether the grace period elapsed.
    pub async fn stop(&self) {
        let multiplexer = {
            let mut state = self.inner.state.lock().await;
            if state.stopped {
                return;
            }
            state.stopped = true;
            state.multiplexer.take()
        };
        if let Some(multiplexer) = multiplexer {
            transport::reject_all_pending(&multiplexer.pending, || SupervisorError::NotRunning).await;
            drop(multiplexer.stdin_tx);
        }
        self.inner.stop_notify.notify_one();

        let handle = self.inner.monitor_handle.lock().await.take();
        if let Some(handle) = handle {
            if tokio::time::timeout(STOP_GRACE_PERIOD, handle).await.is_err() {
                tracing::warn!("timed out waiting for plugin shutdown to complete");
            }
        }
    }
}

fn extract_sensors(value: Value) -> Result<Vec<SensorRecord>, SupervisorError> {
    let sensors = value.get("sensors").cloned().unwrap_or(Value::Array(Vec::new()));
    Ok(serde_json::from_value(sensors)?)
}

async fn send(inner: &Arc<Inner>, method: Method, params: Value) -> Result<Value, SupervisorError> {
    let (stdin_tx, pending) = {
        let state = inner.state.lock().await;
        if state.stopped {
            return Err(SupervisorError::NotRunning);
        }
        let multiplexer = state.multiplexer.as_ref().ok_or(SupervisorError::NotRunning)?;
        (multiplexer.stdin_tx.clone(), Arc::clone(&multiplexer.pending))
    };

    let id = transport::next_request_id(&inner.next_id);
    let (tx, rx) = oneshot::channel();
    pending.lock().await.insert(id, tx);

    let request = Request::new(method.as_str(), params, id);
    let line = serde_json::to_string(&request)?;
    if stdin_tx.send(line).is_err() {
        pending.lock().await.remove(&id);
        return Err(SupervisorError::NotRunning);
    }

    let timeout = inner.options.request_timeout();
    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_canceled)) => Err(SupervisorError::NotRunning),
        Err(_elapsed) => {
            pending.lock().await.remove(&id);
            Err(SupervisorError::Timeout {
                method: method.as_str().to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}

/// Spawns the child, wires up its stdio to background reader/writer/log
/// tasks, waits for readiness, and installs the new child into
/// `inner.child`. Used both for the initial spawn and for every restart.
async fn spawn_one(inner: &Arc<Inner>) -> Result<Multiplexer, SupervisorError> {
    let launch = inner.launch.lock().await.clone();
    let mut child = transport::spawn_with_retry(&launch).await?;

    let stdin = child.stdin.take().expect("stdin is piped");
    let stdout = child.stdout.take().expect("stdout is piped");
    let stderr = child.stderr.take().expect("stderr is piped");

    let (stdin_tx, stdin_rx) = mpsc::unbounded_channel::<String>();
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
    let (ready_tx, ready_rx) = oneshot::channel();

    let writer = tokio::spawn(transport::writer_task(stdin, stdin_rx));
    let reader = tokio::spawn(transport::reader_task(stdout, Arc::clone(&pending)));
    let stderr_handle = tokio::spawn(transport::stderr_task(
        stderr,
        Arc::clone(&inner.logs),
        inner.callbacks.on_log.clone(),
        inner.options.mirror_stdio,
        Some(ready_tx),
    ));
    {
        let mut tasks = inner.tasks.lock().await;
        tasks.push(writer);
        tasks.push(reader);
        tasks.push(stderr_handle);
    }

    match tokio::time::timeout(inner.options.readiness_timeout(), ready_rx).await {
        Ok(Ok(())) => {
            *inner.child.lock().await = Some(child);
            Ok(Multiplexer { stdin_tx, pending })
        }
        _ => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            Err(SupervisorError::ReadinessTimeout)
        }
    }
}

async fn wait_for_child_exit(child: &Arc<Mutex<Option<Child>>>) -> Option<i32> {
    let mut guard = child.lock().await;
    match guard.as_mut() {
        Some(child) => child.wait().await.ok().and_then(|status| status.code()),
        None => std::future::pending::<Option<i32>>().await,
    }
}

/// Owns the child's lifetime after the initial spawn: waits for either
/// an unexpected exit (triggering the bounded-restart policy with
/// configure replay) or an explicit `stop()`.
async fn monitor(inner: Arc<Inner>) {
    loop {
        tokio::select! {
            code = wait_for_child_exit(&inner.child) => {
                if inner.state.lock().await.stopped {
                    break;
                }

                {
                    let mut state = inner.state.lock().await;
                    if let Some(multiplexer) = state.multiplexer.take() {
                        transport::reject_all_pending(&multiplexer.pending, || {
                            SupervisorError::Exited { code: code.unwrap_or(-1) }
                        }).await;
                    }
                }
                if let Some(callback) = &inner.callbacks.on_exit {
                    callback(code);
                }

                let mut state = inner.state.lock().await;
                if state.stopped {
                    break;
                }
                if state.restart_count >= inner.options.max_restarts {
                    state.stopped = true;
                    drop(state);
                    if let Some(callback) = &inner.callbacks.on_max_restarts_exceeded {
                        callback();
                    }
                    break;
                }
                state.restart_count += 1;
                let restart_count = state.restart_count;
                drop(state);

                if let Some(callback) = &inner.callbacks.on_restart {
                    callback(restart_count);
                }
                tokio::time::sleep(inner.options.restart_delay()).await;

                match spawn_one(&inner).await {
                    Ok(multiplexer) => {
                        let last_configure = {
                            let mut state = inner.state.lock().await;
                            state.multiplexer = Some(multiplexer);
                            state.last_configure.clone()
                        };
                        if let Some(params) = last_configure {
                            if let Err(err) = send(&inner, Method::Configure, params).await {
                                tracing::warn!(%err, "failed to replay configuration after restart");
                            }
                        }
                    }
                    Err(err) => {
                        tracing::warn!(%err, "failed to respawn plugin process");
                        inner.state.lock().await.stopped = true;
                        break;
                    }
                }
            }
            _ = inner.stop_notify.notified() => {
                let mut guard = inner.child.lock().await;
                if let Some(child) = guard.as_mut() {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                }
                break;
            }
        }
    }
}
