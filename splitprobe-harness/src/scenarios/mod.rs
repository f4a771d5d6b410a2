//! Traffic scenarios
//!
//! Each scenario drives traffic through the router, classifies what came
//! back and records its checks in a [`ScenarioReport`]. The ledger is reset
//! before every scenario so its counts belong to that scenario alone.

mod multi_path;
mod origin_outage;
mod round_robin;
mod sticky_session;
mod weighted_split;

use crate::error::HarnessResult;
use crate::report::ScenarioReport;
use crate::topology::BoundTopology;
use splitprobe_config::ScenariosConfig;
use splitprobe_core::{Observation, Outcome, OutcomeClassifier, RequestLedger};
use splitprobe_origins::FleetHandle;
use splitprobe_traffic::TrafficSimulator;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Available scenarios, in the order a full run executes them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScenarioKind {
    WeightedSplit,
    StickySession,
    RoundRobin,
    MultiPath,
    OriginOutage,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 5] = [
        ScenarioKind::WeightedSplit,
        ScenarioKind::StickySession,
        ScenarioKind::RoundRobin,
        ScenarioKind::MultiPath,
        ScenarioKind::OriginOutage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioKind::WeightedSplit => "weighted-split",
            ScenarioKind::StickySession => "sticky-session",
            ScenarioKind::RoundRobin => "round-robin",
            ScenarioKind::MultiPath => "multi-path",
            ScenarioKind::OriginOutage => "origin-outage",
        }
    }

    /// Deduplicated selection in canonical order; empty means all
    pub fn selection(requested: &[ScenarioKind]) -> Vec<ScenarioKind> {
        if requested.is_empty() {
            return Self::ALL.to_vec();
        }
        let mut selected = requested.to_vec();
        selected.sort();
        selected.dedup();
        selected
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown scenario '{}', expected one of: {}", s, names.join(", "))
            })
    }
}

/// What a scenario may use
pub struct ScenarioContext<'a> {
    pub simulator: &'a TrafficSimulator,
    pub topology: &'a BoundTopology,
    pub ledger: &'a RequestLedger,
    pub fleet: &'a mut FleetHandle,
    pub settings: &'a ScenariosConfig,
}

impl ScenarioContext<'_> {
    pub fn classify(&self, observations: &[Observation]) -> Vec<Outcome> {
        OutcomeClassifier::new(&self.topology.table).classify_all(observations)
    }
}

/// Reset the ledger, run one scenario and attach the final ledger snapshot
pub async fn run_scenario(
    kind: ScenarioKind,
    ctx: &mut ScenarioContext<'_>,
) -> HarnessResult<ScenarioReport> {
    info!("Running scenario {}", kind);
    ctx.ledger.reset();

    let mut report = match kind {
        ScenarioKind::WeightedSplit => weighted_split::run(ctx).await?,
        ScenarioKind::StickySession => sticky_session::run(ctx).await?,
        ScenarioKind::RoundRobin => round_robin::run(ctx).await?,
        ScenarioKind::MultiPath => multi_path::run(ctx).await?,
        ScenarioKind::OriginOutage => origin_outage::run(ctx).await?,
    };
    report.ledger = ctx.ledger.snapshot();

    info!(
        "Scenario {} {} ({} request(s))",
        kind,
        if report.passed() { "passed" } else { "failed" },
        report.observations
    );
    Ok(report)
}
