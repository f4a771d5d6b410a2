//! Mock origin fleet for splitprobe
//!
//! Every origin is a small axum server on its own port. Whatever it receives
//! (any method, any path) is counted in the shared [`RequestLedger`] and
//! answered with a plain-text body naming the origin, so the harness can
//! tell which origin the router picked.
//!
//! [`RequestLedger`]: splitprobe_core::RequestLedger

pub mod error;
pub mod fleet;
mod handler;

pub use error::FleetError;
pub use fleet::{FleetHandle, FleetSettings, MockOriginFleet};
