//! A redirect-following user pinned to one variant should spread its
//! requests evenly over that variant's origins

use super::ScenarioContext;
use crate::error::HarnessResult;
use crate::report::ScenarioReport;
use splitprobe_core::validator::{check_fairness, check_stickiness, CheckResult};
use splitprobe_core::Outcome;
use std::collections::BTreeMap;

pub(super) async fn run(ctx: &mut ScenarioContext<'_>) -> HarnessResult<ScenarioReport> {
    let settings = &ctx.settings.round_robin;
    let mut report = ScenarioReport::new("round-robin");

    let Some(subpath) = ctx.topology.subpaths().first().map(|s| s.to_string()) else {
        report.check(CheckResult::fail("round-robin variant", "no tests configured"));
        return Ok(report);
    };

    let (user, observations) = ctx.simulator.follow_actor(&subpath, settings.requests).await?;
    let outcomes = ctx.classify(&observations);
    report.record(&observations, &outcomes);

    let mut by_actor = BTreeMap::new();
    by_actor.insert(user.id(), outcomes.clone());
    report.check(check_stickiness(&by_actor));

    let Some(variant) = outcomes.iter().find_map(Outcome::variant) else {
        report.check(CheckResult::fail(
            "round-robin variant",
            format!("no request to {subpath} resolved to a variant"),
        ));
        return Ok(report);
    };
    let Some(binding) = ctx.topology.table.binding(variant) else {
        report.check(CheckResult::fail(
            "round-robin variant",
            format!("{variant} is not a declared variant"),
        ));
        return Ok(report);
    };
    report.note(format!(
        "user {} pinned to {} with {} origin(s)",
        user.id(),
        variant,
        binding.origins.len()
    ));

    let names: Vec<&str> = binding.origins.iter().map(|o| o.name()).collect();
    let received = ctx.ledger.counts_for(names.iter().copied());
    report.check(check_fairness(&received, settings.max_spread));

    // Every followed redirect lands on exactly one origin, so what the
    // bodies claim must match what the origins counted
    let mut classified: BTreeMap<String, u64> =
        names.iter().map(|name| (name.to_string(), 0)).collect();
    for origin in outcomes.iter().filter_map(Outcome::origin) {
        *classified.entry(origin.name().to_string()).or_insert(0) += 1;
    }
    let mismatched: Vec<String> = classified
        .iter()
        .filter(|(name, count)| received.get(*name) != Some(*count))
        .map(|(name, count)| {
            format!(
                "{name}: {count} classified vs {} received",
                received.get(name).copied().unwrap_or(0)
            )
        })
        .collect();
    report.check(if mismatched.is_empty() {
        CheckResult::pass("ledger consistency", "classified bodies match origin counts")
    } else {
        CheckResult::fail("ledger consistency", mismatched.join("; "))
    });

    Ok(report)
}
