//! Core domain model for splitprobe
//!
//! This crate holds the pieces of the harness that never touch the network:
//! origin identities and variant bindings, the shared request ledger,
//! observations produced by simulated traffic, the routing table used to
//! map a response back to an origin, the outcome classifier and the
//! distribution checks run over classified outcomes.

pub mod body;
pub mod classifier;
pub mod error;
pub mod ledger;
pub mod model;
pub mod observation;
pub mod routing;
pub mod validator;

// Re-export commonly used types at the crate root
pub use body::{parse_origin_body, render_origin_body, OriginBody};
pub use classifier::{Outcome, OutcomeClassifier, UnresolvedReason};
pub use error::RoutingTableError;
pub use ledger::RequestLedger;
pub use model::{ActorId, OriginIdentity, VariantBinding, VariantKey};
pub use observation::{FailureKind, Observation, OriginSignal, RequestFailure};
pub use routing::{OriginRole, Route, RoutingTable};
pub use validator::CheckResult;
