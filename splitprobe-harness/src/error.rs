//! Run-level errors. Each one aborts the run; failed checks do not.

use splitprobe_config::ConfigError;
use splitprobe_core::RoutingTableError;
use splitprobe_http::ProvisionError;
use splitprobe_origins::FleetError;
use splitprobe_traffic::TrafficError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("provisioning failed: {0}")]
    Provision(#[from] ProvisionError),

    #[error("mock origin fleet failed: {0}")]
    Fleet(#[from] FleetError),

    #[error("router traffic failed: {0}")]
    Traffic(#[from] TrafficError),

    #[error("inconsistent routing table: {0}")]
    RoutingTable(#[from] RoutingTableError),

    #[error("variant {variant} belongs to test {test}, which was not provisioned")]
    UnprovisionedTest { test: String, variant: String },

    #[error("origins not reported alive after {waited:?}: {}", pending.join(", "))]
    Readiness {
        waited: Duration,
        pending: Vec<String>,
    },
}

pub type HarnessResult<T> = Result<T, HarnessError>;
