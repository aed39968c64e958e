use std::collections::{HashMap, VecDeque};
use std::process::Stdio;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use junction_protocol::{Id, Response};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::options::StdioLaunchConfig;
use crate::SupervisorError;

pub(crate) type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, SupervisorError>>>>>;
pub(crate) type LogBuffer = Arc<Mutex<VecDeque<String>>>;

const MAX_SPAWN_ATTEMPTS: u32 = 5;
const MAX_BACKOFF: Duration = Duration::from_millis(50);

/// Spawns the launch command, retrying on `ExecutableFileBusy` (a
/// freshly-written executable that is still being flushed to disk by the
/// OS returns this transiently on some platforms) with capped
/// exponential backoff.
pub(crate) async fn spawn_with_retry(launch: &StdioLaunchConfig) -> Result<Child, SupervisorError> {
    let mut attempt = 0u32;
    let mut delay = Duration::from_millis(5);
    loop {
        let mut command = Command::new(&launch.command);
        command
            .args(&launch.args)
            .current_dir(&launch.current_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &launch.env {
            command.env(key, value);
        }
        match command.spawn() {
            Ok(child) => return Ok(child),
            Err(err) if is_executable_busy(&err) && attempt < MAX_SPAWN_ATTEMPTS => {
                attempt += 1;
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_BACKOFF);
            }
            Err(err) => return Err(SupervisorError::Spawn { source: err }),
        }
    }
}

fn is_executable_busy(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::ExecutableFileBusy || err.raw_os_error() == Some(26)
}

pub(crate) async fn writer_task(mut stdin: ChildStdin, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = rx.recv().await {
        if stdin.write_all(line.as_bytes()).await.is_err() {
            break;
        }
        if stdin.write_all(b"\n").await.is_err() {
            break;
        }
        if stdin.flush().await.is_err() {
            break;
        }
    }
}

pub(crate) async fn reader_task(stdout: ChildStdout, pending: PendingMap) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => handle_response_line(&line, &pending).await,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(%err, "error reading plugin stdout");
                break;
            }
        }
    }
}

async fn handle_response_line(line: &str, pending: &PendingMap) {
    let response: Response = match serde_json::from_str(line) {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!(%err, line, "discarding malformed response line");
            return;
        }
    };
    let Id::Number(id) = response.id else {
        tracing::debug!("discarding response with non-numeric id");
        return;
    };
    let Some(sender) = pending.lock().await.remove(&id) else {
        return;
    };
    let result = match (response.result, response.error) {
        (Some(value), _) => Ok(value),
        (None, Some(error)) => Err(SupervisorError::Rpc {
            code: error.code,
            message: error.message,
        }),
        (None, None) => Ok(Value::Null),
    };
    let _ = sender.send(result);
}

/// Reads plugin stderr lines, prepends a `[host]`-style tag, and forwards
/// the tagged line to the log ring buffer, the optional `onLog` callback,
/// and — when `mirror_stdio` is set — the host's own stderr (handy for
/// interactive debugging without wiring up a callback). The first line
/// also resolves `ready_tx`, the readiness handshake — it still flows to
/// every sink, tagged, like every other line.
pub(crate) async fn stderr_task(
    stderr: ChildStderr,
    logs: LogBuffer,
    on_log: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    mirror_stdio: bool,
    mut ready_tx: Option<oneshot::Sender<()>>,
) {
    const MAX_LOG_LINES: usize = 500;
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Some(tx) = ready_tx.take() {
                    let _ = tx.send(());
                }
                let tagged = format!("[host] {line}");
                {
                    let mut logs = logs.lock().await;
                    logs.push_back(tagged.clone());
                    if logs.len() > MAX_LOG_LINES {
                        logs.pop_front();
                    }
                }
                if mirror_stdio {
                    eprintln!("{tagged}");
                }
                if let Some(callback) = &on_log {
                    callback(&tagged);
                }
            }
            Ok(None) => break,
            Err(err) => {
                tracing::debug!(%err, "error reading plugin stderr");
                break;
            }
        }
    }
}

/// Rejects and drains every in-flight request, as happens both on an
/// unexpected child exit and on explicit `stop()`.
pub(crate) async fn reject_all_pending(pending: &PendingMap, error: impl Fn() -> SupervisorError) {
    let mut pending = pending.lock().await;
    for (_, sender) in pending.drain() {
        let _ = sender.send(Err(error()));
    }
}

pub(crate) fn next_request_id(counter: &std::sync::atomic::AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::SeqCst)
}
