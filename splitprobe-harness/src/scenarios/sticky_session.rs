//! Persistent users must keep landing on the variant they were first given

use super::ScenarioContext;
use crate::error::HarnessResult;
use crate::report::ScenarioReport;
use splitprobe_core::validator::{check_fallback, check_stickiness, check_unresolved};
use splitprobe_core::{ActorId, Outcome};
use splitprobe_http::RedirectMode;
use std::collections::BTreeMap;

pub(super) async fn run(ctx: &mut ScenarioContext<'_>) -> HarnessResult<ScenarioReport> {
    let settings = &ctx.settings.sticky_session;
    let mut report = ScenarioReport::new("sticky-session");
    let subpaths = ctx.topology.subpaths();

    let mut by_actor: BTreeMap<ActorId, Vec<Outcome>> = BTreeMap::new();
    let mut all_outcomes = Vec::new();

    // Several users, each visiting every test
    for user in ctx.simulator.actors(settings.users, RedirectMode::Manual)? {
        for subpath in &subpaths {
            let observations = user.repeat(subpath, settings.requests_per_user).await;
            let outcomes = ctx.classify(&observations);
            report.record(&observations, &outcomes);
            by_actor.entry(user.id()).or_default().extend(outcomes.iter().cloned());
            all_outcomes.extend(outcomes);
        }
    }

    // One long-lived jar replayed against the first test
    if let Some(first) = subpaths.first() {
        let (user, observations) = ctx
            .simulator
            .sticky_actor(first, settings.replay_requests)
            .await?;
        let outcomes = ctx.classify(&observations);
        report.record(&observations, &outcomes);
        if let Some(variant) = outcomes.iter().find_map(Outcome::variant) {
            report.note(format!(
                "replay user {} pinned to {} on {}",
                user.id(),
                variant,
                first
            ));
        }
        by_actor.entry(user.id()).or_default().extend(outcomes.iter().cloned());
        all_outcomes.extend(outcomes);
    }

    report.check(check_stickiness(&by_actor));
    report.check(check_unresolved(&all_outcomes, 0));
    report.check(check_fallback(&all_outcomes, 0));
    Ok(report)
}
