//! `splitprobe run`

use anyhow::{Context, Result};
use splitprobe_config::ProbeConfig;
use splitprobe_harness::{Harness, RunReport, ScenarioKind};
use tracing::{error, info};

/// Run the selected scenarios and print the report. Returns whether every
/// check passed.
pub async fn run_command(
    config: ProbeConfig,
    scenarios: &[ScenarioKind],
    json: bool,
    serve_after: bool,
) -> Result<bool> {
    let harness = Harness::new(config).context("Invalid configuration")?;
    let mut prepared = harness
        .prepare()
        .await
        .context("Failed to prepare the router for a run")?;

    let result = prepared.run_scenarios(scenarios).await;

    if serve_after && result.is_ok() {
        prepared
            .serve_until(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for Ctrl+C: {}", e);
                }
            })
            .await;
    }

    let finished = prepared.finish().await;
    let report = result.context("Scenario run aborted")?;
    finished.context("Failed to clean up after the run")?;

    print_report(&report, json)?;
    info!(
        "Run finished: {}/{} check(s) passed",
        report.total_checks() - report.failed_checks(),
        report.total_checks()
    );
    Ok(report.passed())
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        let formatted =
            serde_json::to_string_pretty(report).context("Failed to format report as JSON")?;
        println!("{}", formatted);
    } else {
        print!("{}", report);
    }
    Ok(())
}
