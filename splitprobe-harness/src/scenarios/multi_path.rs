//! Users interleaving requests across several tests. Each test assigns its
//! own variant and stickiness in one test must not leak into another.

use super::ScenarioContext;
use crate::error::HarnessResult;
use crate::report::ScenarioReport;
use splitprobe_core::validator::{check_fallback, check_stickiness, check_unresolved, CheckResult};
use splitprobe_core::{ActorId, Outcome};
use splitprobe_http::RedirectMode;
use std::collections::BTreeMap;

pub(super) async fn run(ctx: &mut ScenarioContext<'_>) -> HarnessResult<ScenarioReport> {
    let settings = &ctx.settings.multi_path;
    let mut report = ScenarioReport::new("multi-path");
    let subpaths = ctx.topology.subpaths();

    if subpaths.len() < 2 {
        report.check(CheckResult::fail(
            "path isolation",
            format!("needs at least two tests, {} configured", subpaths.len()),
        ));
        return Ok(report);
    }

    let users = ctx.simulator.actors(settings.users, RedirectMode::Manual)?;
    let mut by_actor: BTreeMap<ActorId, Vec<Outcome>> = BTreeMap::new();
    let mut all_outcomes = Vec::new();
    let mut leaks = Vec::new();

    for _ in 0..settings.rounds {
        for user in &users {
            for subpath in &subpaths {
                let observation = user.request(subpath).await;
                let outcome = ctx.classify(std::slice::from_ref(&observation));
                report.record(std::slice::from_ref(&observation), &outcome);

                for resolved in &outcome {
                    if let Some(variant) = resolved.variant() {
                        let owner = ctx.topology.table.binding(variant).map(|b| b.subpath.as_str());
                        if owner != Some(*subpath) {
                            leaks.push(format!("{} on {} landed in {}", user.id(), subpath, variant));
                        }
                    }
                }

                by_actor.entry(user.id()).or_default().extend(outcome.iter().cloned());
                all_outcomes.extend(outcome);
            }
        }
    }

    for (actor, outcomes) in &by_actor {
        let assigned: Vec<String> = subpaths
            .iter()
            .filter_map(|subpath| {
                outcomes
                    .iter()
                    .filter_map(Outcome::variant)
                    .find(|v| {
                        ctx.topology.table.binding(v).map(|b| b.subpath.as_str()) == Some(*subpath)
                    })
                    .map(|v| v.to_string())
            })
            .collect();
        report.note(format!("{actor}: {}", assigned.join(", ")));
    }

    report.check(check_stickiness(&by_actor));
    report.check(check_unresolved(&all_outcomes, 0));
    report.check(check_fallback(&all_outcomes, 0));
    report.check(if leaks.is_empty() {
        CheckResult::pass(
            "path isolation",
            format!("{} test(s) resolved only to their own variants", subpaths.len()),
        )
    } else {
        CheckResult::fail("path isolation", leaks.join("; "))
    });

    Ok(report)
}
