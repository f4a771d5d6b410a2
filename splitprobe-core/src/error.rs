//! Core error types

use thiserror::Error;

/// Errors raised while building a routing table from bound origins
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoutingTableError {
    #[error("origin '{name}' has no bound port")]
    UnboundOrigin { name: String },

    #[error("port {port} is claimed by both '{first}' and '{second}'")]
    DuplicatePort {
        port: u16,
        first: String,
        second: String,
    },

    #[error("origin name '{0}' appears more than once")]
    DuplicateName(String),
}
