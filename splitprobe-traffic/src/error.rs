//! Traffic errors

use splitprobe_http::HttpError;
use thiserror::Error;

/// Setup failures. Failed requests are observations, not errors.
#[derive(Debug, Error)]
pub enum TrafficError {
    #[error("router unreachable at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid router URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error(transparent)]
    Http(#[from] HttpError),
}
