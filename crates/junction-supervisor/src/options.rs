use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::SupervisorError;

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_restarts() -> u32 {
    3
}

fn default_restart_delay_ms() -> u64 {
    1_000
}

/// Per-supervisor tunables. Serializable so a host can load overrides
/// from an on-disk `config.toml`; the callback set is attached
/// separately at construction time since closures don't serialize.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorOptions {
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Timeout for the initial readiness handshake. Defaults to
    /// `request_timeout_ms` when unset, per the external-interfaces
    /// contract ("readiness timeout, shared with request timeout"); test
    /// suites commonly override this lower (as low as 15s, sometimes
    /// lower still for fast fixtures).
    #[serde(default)]
    pub readiness_timeout_ms: Option<u64>,
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,
    #[serde(default)]
    pub mirror_stdio: bool,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            readiness_timeout_ms: None,
            max_restarts: default_max_restarts(),
            restart_delay_ms: default_restart_delay_ms(),
            mirror_stdio: false,
        }
    }
}

impl SupervisorOptions {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms.unwrap_or(self.request_timeout_ms))
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    /// Loads overrides from an on-disk `toml` file such as `config.toml`,
    /// falling back to [`Default`] for any field the file omits (every
    /// field carries a `#[serde(default = ...)]`). Mirrors the pattern a
    /// host uses to load `McpServerDefinition`-style overrides rather than
    /// hardcoding tunables per supervisor instance.
    pub fn from_toml_file(path: &Path) -> Result<Self, SupervisorError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SupervisorError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| SupervisorError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// The fully-resolved command line the supervisor spawns. Entry-artifact
/// sniffing (pre-built vs. source-form) is a host-layer concern (see
/// `resolve::resolve_command`); the supervisor only needs the final
/// command, arguments, working directory, and environment.
#[derive(Clone, Debug)]
pub struct StdioLaunchConfig {
    pub command: OsString,
    pub args: Vec<OsString>,
    pub current_dir: PathBuf,
    pub env: Vec<(OsString, OsString)>,
}

impl StdioLaunchConfig {
    pub fn new(command: impl Into<OsString>, current_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            current_dir: current_dir.into(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = OsString>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

type LogCallback = dyn Fn(&str) + Send + Sync;
type ExitCallback = dyn Fn(Option<i32>) + Send + Sync;
type RestartCallback = dyn Fn(u32) + Send + Sync;
type MaxRestartsCallback = dyn Fn() + Send + Sync;

/// Host hooks invoked on the supervisor's background events. None are
/// required; a supervisor with no callbacks still restarts and replays
/// configuration, it just doesn't notify anyone.
#[derive(Clone, Default)]
pub struct SupervisorCallbacks {
    pub(crate) on_log: Option<Arc<LogCallback>>,
    pub(crate) on_exit: Option<Arc<ExitCallback>>,
    pub(crate) on_restart: Option<Arc<RestartCallback>>,
    pub(crate) on_max_restarts_exceeded: Option<Arc<MaxRestartsCallback>>,
}

impl SupervisorCallbacks {
    pub fn on_log(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_log = Some(Arc::new(callback));
        self
    }

    pub fn on_exit(mut self, callback: impl Fn(Option<i32>) + Send + Sync + 'static) -> Self {
        self.on_exit = Some(Arc::new(callback));
        self
    }

    pub fn on_restart(mut self, callback: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.on_restart = Some(Arc::new(callback));
        self
    }

    pub fn on_max_restarts_exceeded(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_max_restarts_exceeded = Some(Arc::new(callback));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_overrides_from_a_toml_file_defaulting_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "maxRestarts = 7\nrestartDelayMs = 250\n").unwrap();

        let options = SupervisorOptions::from_toml_file(&path).unwrap();
        assert_eq!(options.max_restarts, 7);
        assert_eq!(options.restart_delay_ms, 250);
        assert_eq!(options.request_timeout_ms, default_request_timeout_ms(), "omitted fields default");
    }

    #[test]
    fn missing_file_surfaces_a_config_read_error() {
        let err = SupervisorOptions::from_toml_file(Path::new("/does/not/exist.toml")).unwrap_err();
        assert!(matches!(err, SupervisorError::ConfigRead { .. }));
    }
}
