//! Statistical and behavioral checks over classified outcomes
//!
//! Every check returns a [`CheckResult`] rather than an error: a failed
//! check is a finding about the router, not a fault of the harness.

use crate::classifier::Outcome;
use crate::ledger::RequestLedger;
use crate::model::{VariantBinding, VariantKey};
use crate::observation::Observation;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Verdict of a single check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            detail: detail.into(),
        }
    }

    fn verdict(name: impl Into<String>, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

/// True when every result passed
pub fn all_passed(results: &[CheckResult]) -> bool {
    results.iter().all(|r| r.passed)
}

/// One result per binding: observed share must lie within `tolerance_pct`
/// percentage points of weight / total weight. `outcomes` are the
/// observations of the bindings' subpath; the share is taken over those that
/// resolved to the test plus those answered by a fallback origin, so traffic
/// the router failed to split counts as a miss for every variant.
pub fn check_weights(
    bindings: &[VariantBinding],
    outcomes: &[Outcome],
    tolerance_pct: f64,
) -> Vec<CheckResult> {
    let mut total_weight: HashMap<&str, u64> = HashMap::new();
    for binding in bindings {
        *total_weight.entry(binding.test_name.as_str()).or_insert(0) += u64::from(binding.weight);
    }

    let mut hits: HashMap<&VariantKey, u64> = HashMap::new();
    let mut resolved_per_test: HashMap<&str, u64> = HashMap::new();
    for variant in outcomes.iter().filter_map(Outcome::variant) {
        *hits.entry(variant).or_insert(0) += 1;
        *resolved_per_test.entry(variant.test.as_str()).or_insert(0) += 1;
    }
    let fallbacks = outcomes.iter().filter(|o| o.is_fallback()).count() as u64;

    bindings
        .iter()
        .map(|binding| {
            let key = binding.key();
            let name = format!("weight {key}");
            let test_weight = total_weight
                .get(binding.test_name.as_str())
                .copied()
                .unwrap_or(0);
            let resolved = resolved_per_test
                .get(binding.test_name.as_str())
                .copied()
                .unwrap_or(0);

            if test_weight == 0 {
                return CheckResult::fail(name, "test has zero total weight");
            }
            if resolved == 0 {
                return CheckResult::fail(name, "no outcome resolved to this test");
            }

            let considered = resolved + fallbacks;
            let expected = 100.0 * binding.weight as f64 / test_weight as f64;
            let observed_hits = hits.get(&key).copied().unwrap_or(0);
            let observed = 100.0 * observed_hits as f64 / considered as f64;
            let deviation = (observed - expected).abs();

            let mut detail = format!(
                "observed {observed:.1}% ({observed_hits}/{considered}), expected {expected:.1}% ±{tolerance_pct}"
            );
            if fallbacks > 0 {
                detail.push_str(&format!(", {fallbacks} fallback"));
            }
            CheckResult::verdict(name, deviation <= tolerance_pct, detail)
        })
        .collect()
}

/// Each actor must resolve to exactly one variant per test it hit, on every
/// observation. A fallback or unresolved outcome breaks the pin, as does an
/// actor without a single resolved outcome.
pub fn check_stickiness<A>(outcomes_by_actor: &BTreeMap<A, Vec<Outcome>>) -> CheckResult
where
    A: Ord + std::fmt::Display,
{
    let name = "stickiness";
    if outcomes_by_actor.is_empty() {
        return CheckResult::fail(name, "no actors observed");
    }

    let mut problems = Vec::new();
    for (actor, outcomes) in outcomes_by_actor {
        let mut per_test: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut fallbacks = 0usize;
        let mut unresolved = 0usize;
        for outcome in outcomes {
            match outcome {
                Outcome::Resolved { variant, .. } => {
                    per_test
                        .entry(variant.test.as_str())
                        .or_default()
                        .insert(variant.variant.as_str());
                }
                Outcome::Fallback { .. } => fallbacks += 1,
                Outcome::Unresolved(_) => unresolved += 1,
            }
        }

        if per_test.is_empty() {
            problems.push(format!("{actor}: no resolved outcome"));
            continue;
        }
        for (test, variants) in per_test {
            if variants.len() != 1 {
                let seen: Vec<&str> = variants.into_iter().collect();
                problems.push(format!("{actor}: {test} -> [{}]", seen.join(", ")));
            }
        }
        if fallbacks > 0 {
            problems.push(format!("{actor}: {fallbacks} fallback outcome(s)"));
        }
        if unresolved > 0 {
            problems.push(format!("{actor}: {unresolved} unresolved outcome(s)"));
        }
    }

    if problems.is_empty() {
        CheckResult::pass(
            name,
            format!("{} actor(s) pinned to one variant", outcomes_by_actor.len()),
        )
    } else {
        CheckResult::fail(name, problems.join("; "))
    }
}

/// `max - min <= max_spread` over per-origin counts. Callers include
/// zero entries for origins that received nothing.
pub fn check_fairness(counts_by_origin: &BTreeMap<String, u64>, max_spread: u64) -> CheckResult {
    let name = "fairness";
    let (Some(max), Some(min)) = (
        counts_by_origin.values().max(),
        counts_by_origin.values().min(),
    ) else {
        return CheckResult::fail(name, "no origins to compare");
    };

    let spread = max - min;
    let listing: Vec<String> = counts_by_origin
        .iter()
        .map(|(origin, count)| format!("{origin}={count}"))
        .collect();
    CheckResult::verdict(
        name,
        spread <= max_spread,
        format!("spread {spread} (max {max_spread}): {}", listing.join(", ")),
    )
}

/// Number of unresolved outcomes must not exceed `max`
pub fn check_unresolved(outcomes: &[Outcome], max: usize) -> CheckResult {
    let unresolved: Vec<&Outcome> = outcomes.iter().filter(|o| o.is_unresolved()).collect();
    let mut reasons: BTreeMap<String, usize> = BTreeMap::new();
    for outcome in &unresolved {
        if let Outcome::Unresolved(reason) = outcome {
            *reasons.entry(reason.to_string()).or_insert(0) += 1;
        }
    }

    let mut detail = format!("{} of {} unresolved (max {max})", unresolved.len(), outcomes.len());
    if !reasons.is_empty() {
        let listing: Vec<String> = reasons
            .iter()
            .map(|(reason, count)| format!("{reason} x{count}"))
            .collect();
        detail.push_str(&format!(": {}", listing.join(", ")));
    }
    CheckResult::verdict("unresolved", unresolved.len() <= max, detail)
}

/// Number of outcomes answered by a fallback origin must not exceed `max`.
/// Only meaningful for traffic to a test subpath.
pub fn check_fallback(outcomes: &[Outcome], max: usize) -> CheckResult {
    let mut by_origin: BTreeMap<&str, usize> = BTreeMap::new();
    for outcome in outcomes {
        if let Outcome::Fallback { origin } = outcome {
            *by_origin.entry(origin.name()).or_insert(0) += 1;
        }
    }
    let fallbacks: usize = by_origin.values().sum();

    let mut detail = format!("{fallbacks} of {} fell back (max {max})", outcomes.len());
    if !by_origin.is_empty() {
        let listing: Vec<String> = by_origin
            .iter()
            .map(|(origin, count)| format!("{origin} x{count}"))
            .collect();
        detail.push_str(&format!(": {}", listing.join(", ")));
    }
    CheckResult::verdict("fallback", fallbacks <= max, detail)
}

/// The ledger entry for `origin` must be zero
pub fn check_silent(ledger: &RequestLedger, origin: &str) -> CheckResult {
    let count = ledger.count(origin);
    CheckResult::verdict(
        format!("silent {origin}"),
        count == 0,
        format!("{count} request(s) received"),
    )
}

/// No outcome may resolve to `origin`
pub fn check_never_resolved(outcomes: &[Outcome], origin: &str) -> CheckResult {
    let hits = outcomes
        .iter()
        .filter_map(Outcome::origin)
        .filter(|o| o.name() == origin)
        .count();
    CheckResult::verdict(
        format!("never resolved {origin}"),
        hits == 0,
        format!("{hits} outcome(s) attributed"),
    )
}

/// Share of failed or 5xx observations must not exceed `max_fraction`
pub fn check_error_fraction(observations: &[Observation], max_fraction: f64) -> CheckResult {
    let name = "error fraction";
    if observations.is_empty() {
        return CheckResult::fail(name, "no observations");
    }

    let errors = observations
        .iter()
        .filter(|obs| obs.is_failure() || obs.status.is_some_and(|s| s >= 500))
        .count();
    let fraction = errors as f64 / observations.len() as f64;
    CheckResult::verdict(
        name,
        fraction <= max_fraction,
        format!(
            "{errors}/{} errored ({:.2}, max {max_fraction:.2})",
            observations.len(),
            fraction
        ),
    )
}
