//! Host-side half of the transport: spawns and owns one plugin child
//! process, multiplexes requests by id, waits out the readiness
//! handshake, enforces per-call timeouts, and restarts the child with
//! configuration replay on unexpected exit.

#![forbid(unsafe_code)]

mod error;
mod options;
mod resolve;
mod supervisor;
mod transport;

pub use error::SupervisorError;
pub use junction_protocol::Method;
pub use options::{StdioLaunchConfig, SupervisorCallbacks, SupervisorOptions};
pub use resolve::resolve_command;
pub use supervisor::Supervisor;
