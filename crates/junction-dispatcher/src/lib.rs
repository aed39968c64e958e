//! The plugin-side half of the transport: reads newline-framed JSON-RPC
//! requests from standard input, routes them to user-supplied handlers,
//! and writes newline-framed responses to standard output. Logging and
//! the one-line readiness handshake go to standard error; nothing but
//! framed responses is ever written to standard output.

#![forbid(unsafe_code)]

mod error;
mod handler;
mod server;

pub use error::{DispatcherError, HandlerError};
pub use server::{PluginServer, PluginServerBuilder};
