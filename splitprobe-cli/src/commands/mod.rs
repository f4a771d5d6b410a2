//! CLI command implementations

pub mod config;
pub mod run;
pub mod serve_origins;

pub use config::*;
pub use run::*;
pub use serve_origins::*;
