//! Anonymous traffic to every test; observed variant shares must match weights

use super::ScenarioContext;
use crate::error::HarnessResult;
use crate::report::ScenarioReport;
use splitprobe_core::validator::{check_fallback, check_unresolved, check_weights};

pub(super) async fn run(ctx: &mut ScenarioContext<'_>) -> HarnessResult<ScenarioReport> {
    let settings = &ctx.settings.weighted_split;
    let mut report = ScenarioReport::new("weighted-split");

    for subpath in ctx.topology.subpaths() {
        let observations = ctx
            .simulator
            .anonymous_burst(subpath, settings.requests, settings.concurrency)
            .await;
        let outcomes = ctx.classify(&observations);
        report.record(&observations, &outcomes);

        let bindings = ctx.topology.bindings_for_subpath(subpath);
        report.checks(check_weights(&bindings, &outcomes, settings.tolerance_pct));

        let mut unresolved = check_unresolved(&outcomes, settings.max_unresolved);
        unresolved.name = format!("unresolved {subpath}");
        report.check(unresolved);

        let mut fallback = check_fallback(&outcomes, settings.max_fallback);
        fallback.name = format!("fallback {subpath}");
        report.check(fallback);
    }

    Ok(report)
}
