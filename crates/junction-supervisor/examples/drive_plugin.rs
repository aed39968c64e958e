//! Drives the `fixture-plugin` binary through the full method sequence a
//! host would normally run: metadata, configure, test connection, then a
//! poll of fetchSensors. Run with `cargo run -p junction-supervisor
//! --example drive_plugin`.

use junction_protocol::ConfigureParams;
use junction_supervisor::{StdioLaunchConfig, Supervisor, SupervisorCallbacks, SupervisorOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let binary = env!("CARGO_BIN_EXE_fixture-plugin");
    let launch = StdioLaunchConfig::new(binary, std::env::current_dir()?);

    let callbacks = SupervisorCallbacks::default().on_log(|line| println!("[plugin log] {line}"));
    let supervisor = Supervisor::start(launch, SupervisorOptions::default(), callbacks).await?;

    let metadata = supervisor.get_metadata().await?;
    println!("metadata: {:?}", metadata);

    supervisor
        .configure(ConfigureParams {
            collector_id: 1,
            url: None,
            access_token: None,
            decimal_places: None,
        })
        .await?;

    let sensors = supervisor.fetch_sensors().await?;
    println!("sensors: {:?}", sensors);

    supervisor.stop().await;
    Ok(())
}
