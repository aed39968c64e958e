use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to spawn plugin process: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    #[error("Timeout waiting for plugin ready")]
    ReadinessTimeout,

    #[error("Plugin process not running.")]
    NotRunning,

    #[error("Request timed out after {timeout_ms}ms: {method}")]
    Timeout { method: String, timeout_ms: u64 },

    #[error("Plugin process exited with code {code}")]
    Exited { code: i32 },

    #[error("{message}")]
    Rpc { code: i64, message: String },

    #[error("failed to serialize request: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write to plugin stdin: {0}")]
    Write(#[source] std::io::Error),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("failed to read supervisor options file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse supervisor options file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
