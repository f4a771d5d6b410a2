//! Turning the configured topology into origin requests and, once the
//! fleet has bound its ports, into variant bindings and a routing table

use crate::error::HarnessResult;
use splitprobe_config::TopologyConfig;
use splitprobe_core::{OriginIdentity, RoutingTable, RoutingTableError, VariantBinding};
use std::collections::HashMap;

/// Origins to start, in declaration order. Port 0 asks for an ephemeral port.
pub fn requested_origins(topology: &TopologyConfig) -> Vec<OriginIdentity> {
    topology
        .all_origins()
        .map(|spec| OriginIdentity::new(&spec.name, spec.port))
        .collect()
}

/// The topology with every origin resolved to its bound port
#[derive(Debug, Clone)]
pub struct BoundTopology {
    pub bindings: Vec<VariantBinding>,
    pub fallback: Vec<OriginIdentity>,
    pub table: RoutingTable,
}

impl BoundTopology {
    /// Subpaths of every test, in declaration order
    pub fn subpaths(&self) -> Vec<&str> {
        let mut subpaths: Vec<&str> = Vec::new();
        for binding in &self.bindings {
            if !subpaths.contains(&binding.subpath.as_str()) {
                subpaths.push(&binding.subpath);
            }
        }
        subpaths
    }

    pub fn bindings_for_subpath(&self, subpath: &str) -> Vec<VariantBinding> {
        self.bindings
            .iter()
            .filter(|b| b.subpath == subpath)
            .cloned()
            .collect()
    }
}

pub fn bind_topology(
    topology: &TopologyConfig,
    bound: &[OriginIdentity],
    origin_host: &str,
) -> HarnessResult<BoundTopology> {
    let ports: HashMap<&str, u16> = bound.iter().map(|o| (o.name(), o.port())).collect();
    let resolve = |name: &str| -> Result<OriginIdentity, RoutingTableError> {
        ports
            .get(name)
            .map(|port| OriginIdentity::new(name, *port))
            .ok_or_else(|| RoutingTableError::UnboundOrigin {
                name: name.to_string(),
            })
    };

    let mut bindings = Vec::new();
    for test in &topology.tests {
        for variant in &test.variants {
            let origins = variant
                .origins
                .iter()
                .map(|spec| resolve(&spec.name))
                .collect::<Result<Vec<_>, _>>()?;
            bindings.push(VariantBinding {
                test_name: test.name.clone(),
                subpath: test.subpath.clone(),
                variant_name: variant.name.clone(),
                weight: variant.weight,
                origins,
            });
        }
    }

    let fallback = topology
        .fallback_origins
        .iter()
        .map(|spec| resolve(&spec.name))
        .collect::<Result<Vec<_>, _>>()?;

    let table = RoutingTable::new(origin_host, bindings.clone(), fallback.clone())?;
    Ok(BoundTopology {
        bindings,
        fallback,
        table,
    })
}
