//! `splitprobe serve-origins`

use anyhow::{Context, Result};
use splitprobe_config::ProbeConfig;
use splitprobe_harness::Harness;
use tracing::info;

/// Start the mock origin fleet on its configured ports and keep it up until
/// Ctrl+C. Nothing is provisioned.
pub async fn serve_origins_command(config: ProbeConfig) -> Result<()> {
    let harness = Harness::new(config).context("Invalid configuration")?;
    let fleet = harness
        .start_fleet()
        .await
        .context("Failed to start mock origins")?;

    for identity in fleet.identities() {
        if let Some(url) = fleet.url(identity.name()) {
            println!("{:<20} {}", identity.name(), url);
        }
    }
    info!("Serving {} mock origin(s), press Ctrl+C to stop", fleet.len());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Shutting down mock origins");
    fleet.stop().await;

    let received = harness.ledger().snapshot();
    for (origin, count) in received {
        println!("{:<20} {} request(s)", origin, count);
    }
    Ok(())
}
