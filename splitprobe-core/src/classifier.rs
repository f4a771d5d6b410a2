//! Maps observations back to the origin and variant the router chose

use crate::body::parse_origin_body;
use crate::model::{OriginIdentity, VariantKey};
use crate::observation::{FailureKind, Observation, OriginSignal};
use crate::routing::{OriginRole, RoutingTable};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Why an observation could not be attributed to a known origin
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnresolvedReason {
    RequestFailed { kind: FailureKind },
    NoSignal,
    UnexpectedStatus { status: u16 },
    UnparseableLocation { location: String },
    ForeignHost { host: String },
    UnknownPort { port: u16 },
    UnparseableBody,
    UnknownName { name: String },
    PortMismatch { name: String, expected: u16, actual: u16 },
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { kind } => write!(f, "request failed ({kind})"),
            Self::NoSignal => f.write_str("no origin signal"),
            Self::UnexpectedStatus { status } => write!(f, "unexpected status {status}"),
            Self::UnparseableLocation { location } => {
                write!(f, "unparseable location '{location}'")
            }
            Self::ForeignHost { host } => write!(f, "foreign host '{host}'"),
            Self::UnknownPort { port } => write!(f, "unknown port {port}"),
            Self::UnparseableBody => f.write_str("unparseable body"),
            Self::UnknownName { name } => write!(f, "unknown origin '{name}'"),
            Self::PortMismatch {
                name,
                expected,
                actual,
            } => write!(f, "origin '{name}' reported port {actual}, expected {expected}"),
        }
    }
}

/// Result of classifying one observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Resolved {
        origin: OriginIdentity,
        variant: VariantKey,
    },
    Fallback {
        origin: OriginIdentity,
    },
    Unresolved(UnresolvedReason),
}

impl Outcome {
    pub fn origin(&self) -> Option<&OriginIdentity> {
        match self {
            Outcome::Resolved { origin, .. } | Outcome::Fallback { origin } => Some(origin),
            Outcome::Unresolved(_) => None,
        }
    }

    pub fn variant(&self) -> Option<&VariantKey> {
        match self {
            Outcome::Resolved { variant, .. } => Some(variant),
            _ => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Outcome::Unresolved(_))
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::Fallback { .. })
    }
}

/// Stateless classifier over a routing table
#[derive(Debug, Clone, Copy)]
pub struct OutcomeClassifier<'a> {
    table: &'a RoutingTable,
}

impl<'a> OutcomeClassifier<'a> {
    pub fn new(table: &'a RoutingTable) -> Self {
        Self { table }
    }

    pub fn classify(&self, observation: &Observation) -> Outcome {
        if let Some(failure) = &observation.failure {
            return Outcome::Unresolved(UnresolvedReason::RequestFailed { kind: failure.kind });
        }

        let status = observation.status.unwrap_or(0);
        match &observation.signal {
            OriginSignal::Redirect { location } => {
                if !(300..400).contains(&status) {
                    return Outcome::Unresolved(UnresolvedReason::UnexpectedStatus { status });
                }
                self.classify_location(location)
            }
            OriginSignal::Body { text } => {
                if !(200..300).contains(&status) {
                    return Outcome::Unresolved(UnresolvedReason::UnexpectedStatus { status });
                }
                self.classify_body(text)
            }
            OriginSignal::None => match observation.status {
                Some(status) if !(300..400).contains(&status) => {
                    Outcome::Unresolved(UnresolvedReason::UnexpectedStatus { status })
                }
                _ => Outcome::Unresolved(UnresolvedReason::NoSignal),
            },
        }
    }

    pub fn classify_all(&self, observations: &[Observation]) -> Vec<Outcome> {
        observations.iter().map(|obs| self.classify(obs)).collect()
    }

    fn classify_location(&self, location: &str) -> Outcome {
        let url = match Url::parse(location) {
            Ok(url) => url,
            Err(_) => {
                return Outcome::Unresolved(UnresolvedReason::UnparseableLocation {
                    location: location.to_string(),
                })
            }
        };

        let Some(host) = url.host_str() else {
            return Outcome::Unresolved(UnresolvedReason::UnparseableLocation {
                location: location.to_string(),
            });
        };
        if !self.table.host_matches(host) {
            return Outcome::Unresolved(UnresolvedReason::ForeignHost {
                host: host.to_string(),
            });
        }

        let Some(port) = url.port_or_known_default() else {
            return Outcome::Unresolved(UnresolvedReason::UnparseableLocation {
                location: location.to_string(),
            });
        };
        match self.table.by_port(port) {
            Some(route) => resolved(&route.origin, &route.role),
            None => Outcome::Unresolved(UnresolvedReason::UnknownPort { port }),
        }
    }

    fn classify_body(&self, text: &str) -> Outcome {
        let Some(body) = parse_origin_body(text) else {
            return Outcome::Unresolved(UnresolvedReason::UnparseableBody);
        };
        let Some(route) = self.table.by_name(&body.name) else {
            return Outcome::Unresolved(UnresolvedReason::UnknownName { name: body.name });
        };
        if route.origin.port() != body.port {
            return Outcome::Unresolved(UnresolvedReason::PortMismatch {
                name: body.name,
                expected: route.origin.port(),
                actual: body.port,
            });
        }
        resolved(&route.origin, &route.role)
    }
}

fn resolved(origin: &OriginIdentity, role: &OriginRole) -> Outcome {
    match role {
        OriginRole::Variant(key) => Outcome::Resolved {
            origin: origin.clone(),
            variant: key.clone(),
        },
        OriginRole::Fallback => Outcome::Fallback {
            origin: origin.clone(),
        },
    }
}
