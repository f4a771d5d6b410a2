//! Take one origin of a multi-origin variant offline and keep sending a
//! pinned user's traffic. The dead origin must stay silent and the router
//! must keep most requests answered.

use super::ScenarioContext;
use crate::error::HarnessResult;
use crate::report::ScenarioReport;
use splitprobe_core::validator::{
    check_error_fraction, check_never_resolved, check_silent, CheckResult,
};
use splitprobe_core::{Outcome, VariantBinding};
use splitprobe_http::RedirectMode;
use splitprobe_traffic::SimulatedUser;
use tracing::info;

/// New users tried before giving up on landing in a multi-origin variant
const MAX_PLACEMENT_ATTEMPTS: usize = 20;

pub(super) async fn run(ctx: &mut ScenarioContext<'_>) -> HarnessResult<ScenarioReport> {
    let mut report = ScenarioReport::new("origin-outage");

    let Some((user, binding)) = place_user(ctx, &mut report).await? else {
        report.check(CheckResult::fail(
            "outage placement",
            format!(
                "no user landed in a variant with two or more origins after {MAX_PLACEMENT_ATTEMPTS} attempt(s)"
            ),
        ));
        return Ok(report);
    };

    let Some(victim) = binding.origins.first().map(|o| o.name().to_string()) else {
        report.check(CheckResult::fail("outage placement", "variant has no origins"));
        return Ok(report);
    };

    info!("Stopping origin {} of {}", victim, binding.key());
    ctx.fleet.stop_origin(&victim).await?;

    // The origin comes back whatever the outage traffic returns
    let outage = drive_outage(ctx, &mut report, &user, &binding, &victim).await;
    let restarted = ctx.fleet.restart_origin(&victim).await;
    outage?;
    restarted?;
    info!("Restarted origin {}", victim);
    Ok(report)
}

async fn drive_outage(
    ctx: &ScenarioContext<'_>,
    report: &mut ScenarioReport,
    user: &SimulatedUser,
    binding: &VariantBinding,
    victim: &str,
) -> HarnessResult<()> {
    let settings = &ctx.settings.origin_outage;
    let survivors: Vec<&str> = binding.origins[1..].iter().map(|o| o.name()).collect();

    ctx.ledger.reset();
    report.note(format!(
        "user {} pinned to {}; stopped {}, survivors {}",
        user.id(),
        binding.key(),
        victim,
        survivors.join(", ")
    ));

    let observations = user.repeat(&binding.subpath, settings.requests).await;
    let outcomes = ctx.classify(&observations);
    report.record(&observations, &outcomes);

    report.check(check_silent(ctx.ledger, victim));
    report.check(check_never_resolved(&outcomes, victim));
    report.check(check_error_fraction(&observations, settings.max_error_fraction));
    Ok(())
}

/// Create redirect-following users until one is assigned a variant that
/// has a second origin to fall back on
async fn place_user(
    ctx: &ScenarioContext<'_>,
    report: &mut ScenarioReport,
) -> HarnessResult<Option<(SimulatedUser, VariantBinding)>> {
    for subpath in ctx.topology.subpaths() {
        let candidates = ctx.topology.bindings_for_subpath(subpath);
        if !candidates.iter().any(|b| b.origins.len() >= 2) {
            continue;
        }

        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let user = ctx.simulator.new_user(RedirectMode::Follow)?;
            let observation = user.request(subpath).await;
            let outcome = ctx.classify(std::slice::from_ref(&observation));
            report.record(std::slice::from_ref(&observation), &outcome);

            let placed = outcome
                .iter()
                .filter_map(Outcome::variant)
                .find_map(|variant| candidates.iter().find(|b| &b.key() == variant))
                .filter(|binding| binding.origins.len() >= 2)
                .cloned();
            if let Some(binding) = placed {
                return Ok(Some((user, binding)));
            }
        }
    }
    Ok(None)
}
