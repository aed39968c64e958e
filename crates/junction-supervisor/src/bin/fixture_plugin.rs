//! A minimal collector used only by this crate's integration tests. Its
//! behavior is controlled entirely through environment variables so a
//! single binary can stand in for several fixtures:
//!
//! - `FIXTURE_EXIT_AFTER_FETCH`: if set, the process calls
//!   `std::process::exit(1)` on the Nth `fetchSensors` call instead of
//!   responding, simulating a crash mid-conversation.
//!
//! `fetchSensors` always echoes the current configuration back under
//! `lastConfigure` so restart/replay tests can assert on it directly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use junction_dispatcher::PluginServerBuilder;
use junction_protocol::{CollectorMetadata, FieldRequirement};

#[tokio::main]
async fn main() {
    let exit_after_fetch: Option<usize> = std::env::var("FIXTURE_EXIT_AFTER_FETCH")
        .ok()
        .and_then(|value| value.parse().ok());
    let fetch_calls = Arc::new(AtomicUsize::new(0));

    let metadata = CollectorMetadata {
        collector_name: "fixture.test-plugin".to_string(),
        display_name: "Fixture Plugin".to_string(),
        description: "Test-only collector fixture".to_string(),
        category: "test".to_string(),
        emoji: "\u{1f9ea}".to_string(),
        field_requirements: FieldRequirement::default(),
        default_name: "Fixture Plugin".to_string(),
        default_url: None,
        default_poll_rate_ms: 60_000,
        default_send_rate_ms: 60_000,
        setup_instructions: Vec::new(),
        supports_persistent_session: None,
        required_service_type: None,
    };

    let server = PluginServerBuilder::new(metadata)
        .on_fetch_sensors(move |config| {
            let fetch_calls = Arc::clone(&fetch_calls);
            let exit_after_fetch = exit_after_fetch;
            async move {
                let call_number = fetch_calls.fetch_add(1, Ordering::SeqCst) + 1;
                if exit_after_fetch == Some(call_number) {
                    std::process::exit(1);
                }
                Ok(serde_json::json!({
                    "sensors": [],
                    "lastConfigure": config,
                }))
            }
        })
        .build();

    let _ = server.run().await;
}
