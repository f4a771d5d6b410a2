//! Synthetic traffic against the router under test
//!
//! Requests are issued as anonymous visitors (no cookies), as persistent
//! users that keep the router's affinity cookie, or as users that follow
//! redirects all the way to the origin. Every request becomes an
//! [`Observation`](splitprobe_core::Observation); transport failures are
//! recorded, never raised.

pub mod error;
pub mod simulator;
pub mod user;

pub use error::TrafficError;
pub use simulator::TrafficSimulator;
pub use user::SimulatedUser;
