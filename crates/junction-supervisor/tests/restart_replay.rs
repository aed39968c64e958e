use std::time::Duration;

use junction_protocol::{ConfigureParams, Method};
use junction_supervisor::{StdioLaunchConfig, Supervisor, SupervisorCallbacks, SupervisorOptions};

fn fixture_launch(exit_after_fetch: &str) -> StdioLaunchConfig {
    let binary = env!("CARGO_BIN_EXE_fixture-plugin");
    StdioLaunchConfig::new(binary, std::env::temp_dir()).env("FIXTURE_EXIT_AFTER_FETCH", exit_after_fetch)
}

/// Scenario: a fixture plugin that exits with nonzero status on its
/// third `fetchSensors` call. After `configure({collectorId: 42})` and
/// two successful fetches, the third triggers an unexpected exit; the
/// supervisor respawns the child and replays the last configuration
/// before the next call succeeds.
#[tokio::test]
async fn restart_replays_last_configure() {
    let launch = fixture_launch("3");
    let options = SupervisorOptions {
        readiness_timeout_ms: Some(5_000),
        restart_delay_ms: 50,
        ..SupervisorOptions::default()
    };
    let supervisor = Supervisor::start(launch, options, SupervisorCallbacks::default())
        .await
        .expect("plugin starts");

    supervisor
        .configure(ConfigureParams {
            collector_id: 42,
            url: None,
            access_token: None,
            decimal_places: None,
        })
        .await
        .expect("configure succeeds");

    supervisor.fetch_sensors().await.expect("first fetch succeeds");
    supervisor.fetch_sensors().await.expect("second fetch succeeds");

    let third = supervisor.fetch_sensors().await;
    assert!(third.is_err(), "third fetch observes the crash");

    tokio::time::sleep(Duration::from_millis(500)).await;

    let replayed = supervisor
        .call(Method::FetchSensors, serde_json::Value::Null)
        .await
        .expect("new child answers after restart");
    assert_eq!(
        replayed["lastConfigure"]["collectorId"],
        serde_json::json!(42),
        "the respawned child received the replayed configure params"
    );

    supervisor.stop().await;
}

#[tokio::test]
async fn stop_rejects_subsequent_calls() {
    let launch = fixture_launch("1000");
    let options = SupervisorOptions {
        readiness_timeout_ms: Some(5_000),
        ..SupervisorOptions::default()
    };
    let supervisor = Supervisor::start(launch, options, SupervisorCallbacks::default())
        .await
        .expect("plugin starts");

    supervisor.stop().await;

    let err = supervisor.health_check().await.expect_err("stopped supervisor rejects calls");
    assert_eq!(err.to_string(), "Plugin process not running.");
}
