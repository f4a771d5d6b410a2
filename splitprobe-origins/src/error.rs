//! Fleet errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FleetError {
    /// A listener could not bind. The whole start is abandoned.
    #[error("origin '{name}' failed to bind port {port}: {source}")]
    Bind {
        name: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("origin '{0}' is declared more than once")]
    DuplicateOrigin(String),

    #[error("unknown origin '{0}'")]
    UnknownOrigin(String),
}
