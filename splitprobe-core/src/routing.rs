//! Declared mapping from origin identity to the variant it serves

use crate::error::RoutingTableError;
use crate::model::{OriginIdentity, VariantBinding, VariantKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// What an origin is provisioned as
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum OriginRole {
    Variant(VariantKey),
    /// Domain default endpoint, not bound to any variant
    Fallback,
}

/// A known origin and its role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub origin: OriginIdentity,
    pub role: OriginRole,
}

/// Lookup table used by the classifier.
///
/// Built once after the fleet has bound its ports and read-only afterwards.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    origin_host: String,
    bindings: Vec<VariantBinding>,
    by_port: HashMap<u16, Route>,
    by_name: HashMap<String, Route>,
}

impl RoutingTable {
    pub fn new(
        origin_host: impl Into<String>,
        bindings: Vec<VariantBinding>,
        fallback: Vec<OriginIdentity>,
    ) -> Result<Self, RoutingTableError> {
        let mut by_port: HashMap<u16, Route> = HashMap::new();
        let mut by_name: HashMap<String, Route> = HashMap::new();

        let variant_routes = bindings.iter().flat_map(|binding| {
            binding.origins.iter().map(move |origin| Route {
                origin: origin.clone(),
                role: OriginRole::Variant(binding.key()),
            })
        });
        let fallback_routes = fallback.into_iter().map(|origin| Route {
            origin,
            role: OriginRole::Fallback,
        });

        for route in variant_routes.chain(fallback_routes) {
            let name = route.origin.name().to_string();
            let port = route.origin.port();

            if port == 0 {
                return Err(RoutingTableError::UnboundOrigin { name });
            }
            if by_name.contains_key(&name) {
                return Err(RoutingTableError::DuplicateName(name));
            }
            if let Some(existing) = by_port.get(&port) {
                return Err(RoutingTableError::DuplicatePort {
                    port,
                    first: existing.origin.name().to_string(),
                    second: name,
                });
            }

            by_port.insert(port, route.clone());
            by_name.insert(name, route);
        }

        Ok(Self {
            origin_host: origin_host.into(),
            bindings,
            by_port,
            by_name,
        })
    }

    pub fn origin_host(&self) -> &str {
        &self.origin_host
    }

    pub fn bindings(&self) -> &[VariantBinding] {
        &self.bindings
    }

    /// Bindings of the test mounted at `subpath`
    pub fn bindings_for_subpath(&self, subpath: &str) -> Vec<&VariantBinding> {
        self.bindings
            .iter()
            .filter(|binding| binding.subpath == subpath)
            .collect()
    }

    pub fn binding(&self, key: &VariantKey) -> Option<&VariantBinding> {
        self.bindings.iter().find(|binding| &binding.key() == key)
    }

    pub fn by_port(&self, port: u16) -> Option<&Route> {
        self.by_port.get(&port)
    }

    pub fn by_name(&self, name: &str) -> Option<&Route> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Whether `host` names the configured origin host. Loopback aliases
    /// (`localhost`, `127.0.0.1`, `::1`) are interchangeable.
    pub fn host_matches(&self, host: &str) -> bool {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let expected = self
            .origin_host
            .trim_start_matches('[')
            .trim_end_matches(']');

        if host.eq_ignore_ascii_case(expected) {
            return true;
        }
        is_loopback(host) && is_loopback(expected)
    }
}

fn is_loopback(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.parse::<IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}
