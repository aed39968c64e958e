//! Wire types shared by the plugin-side dispatcher and the host-side
//! supervisor: the JSON-RPC envelope, the closed method and error-code
//! sets, collector metadata, sensor records, and the plugin-identifier
//! naming rule.
//!
//! This crate has no I/O of its own — it is pure data plus the handful of
//! pure functions (`clamp_decimal_places`, `decimal_places_of`,
//! `is_plugin_identifier`) that the dispatcher and supervisor both need to
//! agree on.

#![forbid(unsafe_code)]

mod envelope;
mod error;
mod identifier;
mod metadata;
mod methods;
mod sensor;

pub use envelope::{Envelope, ErrorObject, Id, Request, Response};
pub use error::{ErrorCode, ProtocolError};
pub use identifier::is_plugin_identifier;
pub use metadata::{CollectorMetadata, FieldRequirement, SetupStep};
pub use methods::Method;
pub use sensor::{clamp_decimal_places, decimal_places_of, ConfigureParams, DiscoveredPlugin, SensorRecord};

/// The fixed JSON-RPC protocol tag every envelope carries.
pub const JSONRPC_VERSION: &str = "2.0";
