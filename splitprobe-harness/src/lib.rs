//! Verification runs against an A/B router
//!
//! Ties the pieces together: the mock origin fleet, the provisioning
//! session, the traffic simulator and the validators. [`Harness::run`]
//! is the usual entry point; [`Harness::prepare`] exposes the provisioned
//! state for callers that want to drive scenarios themselves.

pub mod error;
pub mod provision;
pub mod readiness;
pub mod report;
pub mod runner;
pub mod scenarios;
pub mod topology;

pub use error::{HarnessError, HarnessResult};
pub use provision::ProvisionedDomain;
pub use report::{RunReport, ScenarioReport};
pub use runner::{Harness, PreparedRun};
pub use scenarios::ScenarioKind;
pub use topology::{bind_topology, requested_origins, BoundTopology};
