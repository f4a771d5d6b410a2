//! Waiting for the router to mark provisioned origins alive

use crate::error::{HarnessError, HarnessResult};
use splitprobe_config::ReadinessConfig;
use splitprobe_http::ProvisioningSession;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Poll `GET /api/endpoints` until every URL in `expected` reports
/// `alive: true`, or fail once the deadline passes.
pub async fn wait_until_alive(
    session: &ProvisioningSession,
    expected: &[String],
    config: &ReadinessConfig,
) -> HarnessResult<()> {
    if !config.enabled {
        debug!("Readiness polling disabled");
        return Ok(());
    }

    info!(
        "Waiting up to {:?} for {} endpoint(s) to be marked alive",
        config.deadline,
        expected.len()
    );
    let started = Instant::now();
    let mut pending: Vec<String> = expected.to_vec();

    loop {
        match session.endpoint_liveness().await {
            Ok(liveness) => {
                pending.retain(|url| !liveness.get(url).copied().unwrap_or(false));
                if pending.is_empty() {
                    info!("All endpoints alive after {:?}", started.elapsed());
                    return Ok(());
                }
                debug!("{} endpoint(s) not alive yet", pending.len());
            }
            Err(e) if e.is_connectivity() => return Err(e.into()),
            Err(e) => warn!("Liveness poll failed: {}", e),
        }

        if started.elapsed() + config.poll_interval > config.deadline {
            return Err(HarnessError::Readiness {
                waited: started.elapsed(),
                pending,
            });
        }
        sleep(config.poll_interval).await;
    }
}
