//! HTTP error types

/// Error type for HTTP operations
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header value for {name}: {value}")]
    InvalidHeader { name: String, value: String },

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Errors raised by the provisioning API client.
///
/// Every variant is fatal for a run: nothing is retried and nothing beyond
/// the pre-run cleanup is rolled back.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Provisioning API unreachable at {url}: {source}")]
    Connectivity {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Creating {kind} failed with status {status}: {body}")]
    Create {
        kind: &'static str,
        status: u16,
        body: String,
    },

    #[error("Deleting {kind} '{id}' failed with status {status}: {body}")]
    Delete {
        kind: &'static str,
        id: String,
        status: u16,
        body: String,
    },

    #[error("Listing {kind} failed with status {status}: {body}")]
    List {
        kind: &'static str,
        status: u16,
        body: String,
    },

    #[error("Malformed {kind} response: {detail}")]
    Malformed { kind: &'static str, detail: String },

    #[error(transparent)]
    Http(#[from] HttpError),
}

impl ProvisionError {
    /// Classify a transport error: refused or timed-out connections mean the
    /// API is unreachable, anything else is a plain HTTP failure.
    pub(crate) fn from_transport(url: &str, error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            ProvisionError::Connectivity {
                url: url.to_string(),
                source: error,
            }
        } else {
            ProvisionError::Http(HttpError::NetworkError(error))
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, ProvisionError::Connectivity { .. })
    }
}

/// Longest response body carried inside an error
pub const BODY_SNIPPET_LIMIT: usize = 512;

/// Truncate `body` to at most [`BODY_SNIPPET_LIMIT`] characters
pub fn body_snippet(body: &str) -> String {
    if body.chars().count() <= BODY_SNIPPET_LIMIT {
        body.to_string()
    } else {
        let mut snippet: String = body.chars().take(BODY_SNIPPET_LIMIT - 1).collect();
        snippet.push('…');
        snippet
    }
}
