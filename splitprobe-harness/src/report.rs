//! Run and scenario reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use splitprobe_core::{CheckResult, Observation, Outcome};
use std::collections::BTreeMap;
use std::fmt;

/// Everything one scenario observed and concluded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub observations: usize,
    pub failed_requests: usize,
    /// Resolved and fallback outcomes per origin name
    pub origin_hits: BTreeMap<String, usize>,
    /// Resolved outcomes per `test/variant`
    pub variant_hits: BTreeMap<String, usize>,
    /// Unresolved outcomes per reason
    pub unresolved: BTreeMap<String, usize>,
    /// Request ledger at the end of the scenario
    pub ledger: BTreeMap<String, u64>,
    pub checks: Vec<CheckResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl ScenarioReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            observations: 0,
            failed_requests: 0,
            origin_hits: BTreeMap::new(),
            variant_hits: BTreeMap::new(),
            unresolved: BTreeMap::new(),
            ledger: BTreeMap::new(),
            checks: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Fold observations and their outcomes into the tallies
    pub fn record(&mut self, observations: &[Observation], outcomes: &[Outcome]) {
        self.observations += observations.len();
        self.failed_requests += observations.iter().filter(|o| o.is_failure()).count();

        for outcome in outcomes {
            match outcome {
                Outcome::Resolved { origin, variant } => {
                    *self.origin_hits.entry(origin.name().to_string()).or_insert(0) += 1;
                    *self.variant_hits.entry(variant.to_string()).or_insert(0) += 1;
                }
                Outcome::Fallback { origin } => {
                    *self.origin_hits.entry(origin.name().to_string()).or_insert(0) += 1;
                }
                Outcome::Unresolved(reason) => {
                    *self.unresolved.entry(reason.to_string()).or_insert(0) += 1;
                }
            }
        }
    }

    pub fn check(&mut self, result: CheckResult) {
        self.checks.push(result);
    }

    pub fn checks(&mut self, results: impl IntoIterator<Item = CheckResult>) {
        self.checks.extend(results);
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn unresolved_total(&self) -> usize {
        self.unresolved.values().sum()
    }

    /// A scenario without checks proves nothing and does not pass
    pub fn passed(&self) -> bool {
        !self.checks.is_empty() && self.checks.iter().all(|c| c.passed)
    }
}

/// Report for a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub router_url: String,
    pub domain_host: String,
    /// Stale domains removed before provisioning
    pub removed_domains: usize,
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(ScenarioReport::passed)
    }

    pub fn failed_checks(&self) -> usize {
        self.scenarios
            .iter()
            .flat_map(|s| s.checks.iter())
            .filter(|c| !c.passed)
            .count()
    }

    pub fn total_checks(&self) -> usize {
        self.scenarios.iter().map(|s| s.checks.len()).sum()
    }
}

fn mark(passed: bool) -> &'static str {
    if passed {
        "PASS"
    } else {
        "FAIL"
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}] {}", mark(self.passed()), self.name)?;
        writeln!(
            f,
            "    {} request(s), {} failed, {} unresolved",
            self.observations,
            self.failed_requests,
            self.unresolved_total()
        )?;
        for (variant, hits) in &self.variant_hits {
            writeln!(f, "    variant {variant}: {hits}")?;
        }
        for (origin, hits) in &self.origin_hits {
            let received = self.ledger.get(origin).copied().unwrap_or(0);
            writeln!(f, "    origin {origin}: {hits} classified, {received} received")?;
        }
        for (reason, count) in &self.unresolved {
            writeln!(f, "    unresolved {reason}: {count}")?;
        }
        for note in &self.notes {
            writeln!(f, "    note: {note}")?;
        }
        for check in &self.checks {
            writeln!(f, "    {} {}: {}", mark(check.passed), check.name, check.detail)?;
        }
        Ok(())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "splitprobe run against {} (Host: {})",
            self.router_url, self.domain_host
        )?;
        if self.removed_domains > 0 {
            writeln!(f, "removed {} stale domain(s) before provisioning", self.removed_domains)?;
        }
        for scenario in &self.scenarios {
            write!(f, "{scenario}")?;
        }
        let duration = self.finished_at - self.started_at;
        writeln!(
            f,
            "{}: {}/{} check(s) passed in {:.1}s",
            mark(self.passed()),
            self.total_checks() - self.failed_checks(),
            self.total_checks(),
            duration.num_milliseconds() as f64 / 1000.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitprobe_core::{ActorId, OriginIdentity, UnresolvedReason, VariantKey};

    #[test]
    fn test_record_tallies_outcomes() {
        let observations = vec![
            Observation::redirect("/cart", ActorId::Anonymous, 302, None),
            Observation::redirect("/cart", ActorId::Anonymous, 302, None),
            Observation::redirect("/cart", ActorId::Anonymous, 302, None),
        ];
        let outcomes = vec![
            Outcome::Resolved {
                origin: OriginIdentity::new("cart_v1_e1", 9001),
                variant: VariantKey::new("Cart", "A"),
            },
            Outcome::Fallback {
                origin: OriginIdentity::new("domain_default_1", 9100),
            },
            Outcome::Unresolved(UnresolvedReason::NoSignal),
        ];

        let mut report = ScenarioReport::new("weighted-split");
        report.record(&observations, &outcomes);

        assert_eq!(report.observations, 3);
        assert_eq!(report.origin_hits.get("cart_v1_e1"), Some(&1));
        assert_eq!(report.origin_hits.get("domain_default_1"), Some(&1));
        assert_eq!(report.variant_hits.get("Cart/A"), Some(&1));
        assert_eq!(report.unresolved_total(), 1);
    }

    #[test]
    fn test_scenario_without_checks_fails() {
        let mut report = ScenarioReport::new("empty");
        assert!(!report.passed());

        report.check(CheckResult::pass("ok", ""));
        assert!(report.passed());

        report.check(CheckResult::fail("bad", "detail"));
        assert!(!report.passed());
        assert!(report.to_string().contains("FAIL bad: detail"));
    }

    #[test]
    fn test_run_report_summary() {
        let mut ok = ScenarioReport::new("sticky-session");
        ok.check(CheckResult::pass("stickiness", "2 actor(s) pinned"));
        let now = Utc::now();
        let report = RunReport {
            started_at: now,
            finished_at: now,
            router_url: "http://localhost:8080/".to_string(),
            domain_host: "sklep.pl".to_string(),
            removed_domains: 1,
            scenarios: vec![ok],
        };

        assert!(report.passed());
        let text = report.to_string();
        assert!(text.contains("removed 1 stale domain(s)"));
        assert!(text.contains("PASS: 1/1 check(s) passed"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["scenarios"][0]["name"], "sticky-session");
    }
}
