//! Observations recorded by the traffic simulator

use crate::model::ActorId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the router response revealed about the chosen origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OriginSignal {
    /// `Location` header of a redirect that was not followed
    Redirect { location: String },
    /// Body of the final response after following redirects
    Body { text: String },
    /// Nothing usable (non-redirect without body mode, or failed request)
    None,
}

/// Category of a request that never produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Connect,
    Redirect,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Connect => "connect",
            FailureKind::Redirect => "redirect",
            FailureKind::Other => "other",
        };
        f.write_str(label)
    }
}

/// A request that failed at the transport level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFailure {
    pub kind: FailureKind,
    pub detail: String,
}

/// One simulated request and what came back; never mutated once recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub subpath: String,
    pub actor: ActorId,
    pub status: Option<u16>,
    pub signal: OriginSignal,
    pub failure: Option<RequestFailure>,
}

impl Observation {
    /// A response whose origin signal is its redirect target, if any
    pub fn redirect(
        subpath: impl Into<String>,
        actor: ActorId,
        status: u16,
        location: Option<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            subpath: subpath.into(),
            actor,
            status: Some(status),
            signal: location
                .map(|location| OriginSignal::Redirect { location })
                .unwrap_or(OriginSignal::None),
            failure: None,
        }
    }

    /// A followed response whose origin signal is its body
    pub fn body(subpath: impl Into<String>, actor: ActorId, status: u16, text: String) -> Self {
        Self {
            timestamp: Utc::now(),
            subpath: subpath.into(),
            actor,
            status: Some(status),
            signal: OriginSignal::Body { text },
            failure: None,
        }
    }

    /// A request that timed out or could not connect
    pub fn failed(subpath: impl Into<String>, actor: ActorId, failure: RequestFailure) -> Self {
        Self {
            timestamp: Utc::now(),
            subpath: subpath.into(),
            actor,
            status: None,
            signal: OriginSignal::None,
            failure: Some(failure),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_without_location_has_no_signal() {
        let obs = Observation::redirect("/cart", ActorId::Anonymous, 302, None);
        assert_eq!(obs.signal, OriginSignal::None);
        assert!(!obs.is_failure());
    }

    #[test]
    fn test_failed_observation() {
        let obs = Observation::failed(
            "/cart",
            ActorId::Anonymous,
            RequestFailure {
                kind: FailureKind::Timeout,
                detail: "operation timed out".to_string(),
            },
        );
        assert!(obs.is_failure());
        assert_eq!(obs.status, None);
    }

    #[test]
    fn test_observation_serializes_signal_tag() {
        let obs = Observation::redirect(
            "/cart",
            ActorId::Anonymous,
            302,
            Some("http://localhost:9001/cart".to_string()),
        );
        let json = serde_json::to_value(&obs).unwrap();
        assert_eq!(json["signal"]["type"], "redirect");
        assert_eq!(json["actor"]["kind"], "anonymous");
    }
}
