//! Sample sizes and acceptance bounds for each verification scenario

use crate::error::ConfigResult;
use crate::validation::{validate_fraction, validate_percentage, validate_positive, Validatable};
use serde::{Deserialize, Serialize};

/// Scenario parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenariosConfig {
    #[serde(default)]
    pub weighted_split: WeightedSplitConfig,

    #[serde(default)]
    pub sticky_session: StickySessionConfig,

    #[serde(default)]
    pub round_robin: RoundRobinConfig,

    #[serde(default)]
    pub multi_path: MultiPathConfig,

    #[serde(default)]
    pub origin_outage: OriginOutageConfig,
}

/// Anonymous traffic against every test, compared with declared weights
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightedSplitConfig {
    /// Anonymous requests per test subpath
    pub requests: usize,
    /// Allowed absolute deviation, in percentage points
    pub tolerance_pct: f64,
    /// Requests in flight at once
    pub concurrency: usize,
    /// Unresolved observations tolerated per subpath
    pub max_unresolved: usize,
    /// Observations answered by a domain default origin tolerated per subpath
    pub max_fallback: usize,
}

/// Persistent users on the first test's subpath
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StickySessionConfig {
    pub users: usize,
    pub requests_per_user: usize,
    /// Length of the single-jar replay of the anonymous burst
    pub replay_requests: usize,
}

/// One sticky user following redirects, checked for even spread over its variant's origins
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundRobinConfig {
    pub requests: usize,
    /// Largest accepted difference between the busiest and idlest origin
    pub max_spread: u64,
}

/// Persistent users alternating between every test subpath
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiPathConfig {
    pub users: usize,
    /// Each round visits every subpath once
    pub rounds: usize,
}

/// One origin of the user's variant is taken offline mid-run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginOutageConfig {
    pub requests: usize,
    /// Largest accepted share of failed requests
    pub max_error_fraction: f64,
}

impl Default for WeightedSplitConfig {
    fn default() -> Self {
        Self {
            requests: 100,
            tolerance_pct: 10.0,
            concurrency: 1,
            max_unresolved: 0,
            max_fallback: 0,
        }
    }
}

impl Default for StickySessionConfig {
    fn default() -> Self {
        Self {
            users: 2,
            requests_per_user: 10,
            replay_requests: 100,
        }
    }
}

impl Default for RoundRobinConfig {
    fn default() -> Self {
        Self {
            requests: 20,
            max_spread: 2,
        }
    }
}

impl Default for MultiPathConfig {
    fn default() -> Self {
        Self { users: 2, rounds: 5 }
    }
}

impl Default for OriginOutageConfig {
    fn default() -> Self {
        Self {
            requests: 20,
            max_error_fraction: 0.6,
        }
    }
}

impl Validatable for ScenariosConfig {
    fn validate(&self) -> ConfigResult<()> {
        let domain = self.domain_name();

        validate_positive(self.weighted_split.requests, "weighted_split.requests", domain)?;
        validate_positive(
            self.weighted_split.concurrency,
            "weighted_split.concurrency",
            domain,
        )?;
        validate_percentage(
            self.weighted_split.tolerance_pct,
            "weighted_split.tolerance_pct",
            domain,
        )?;

        validate_positive(self.sticky_session.users, "sticky_session.users", domain)?;
        validate_positive(
            self.sticky_session.requests_per_user,
            "sticky_session.requests_per_user",
            domain,
        )?;
        validate_positive(
            self.sticky_session.replay_requests,
            "sticky_session.replay_requests",
            domain,
        )?;

        validate_positive(self.round_robin.requests, "round_robin.requests", domain)?;
        validate_positive(self.multi_path.users, "multi_path.users", domain)?;
        validate_positive(self.multi_path.rounds, "multi_path.rounds", domain)?;

        validate_positive(self.origin_outage.requests, "origin_outage.requests", domain)?;
        validate_fraction(
            self.origin_outage.max_error_fraction,
            "origin_outage.max_error_fraction",
            domain,
        )?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "scenarios"
    }
}
