//! Configuring the router through its provisioning API

use crate::error::{HarnessError, HarnessResult};
use crate::topology::BoundTopology;
use splitprobe_config::TopologyConfig;
use splitprobe_core::{OriginIdentity, VariantKey};
use splitprobe_http::{
    DomainPayload, DomainRef, EndpointPayload, ProvisioningSession, ResourceKind, TestPayload,
    TestRef, VariantPayload,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Ids of everything created for one run
#[derive(Debug, Clone, Default)]
pub struct ProvisionedDomain {
    pub host: String,
    pub domain_id: String,
    pub test_ids: BTreeMap<String, String>,
    pub variant_ids: BTreeMap<VariantKey, String>,
    /// URL of every provisioned endpoint, as the API identifies them
    pub endpoint_urls: Vec<String>,
}

/// Create domain, tests, variants and endpoints, parent-first. The first
/// failing create aborts provisioning.
pub async fn provision(
    session: &ProvisioningSession,
    domain_host: &str,
    topology: &TopologyConfig,
    bound: &BoundTopology,
    origin_url: impl Fn(&OriginIdentity) -> String,
) -> HarnessResult<ProvisionedDomain> {
    let domain_id = session
        .create(
            ResourceKind::Domain,
            &DomainPayload {
                host: domain_host.to_string(),
                active: true,
                description: topology.domain_description.clone(),
            },
        )
        .await?;
    info!("Created domain {} (id {})", domain_host, domain_id);

    let mut provisioned = ProvisionedDomain {
        host: domain_host.to_string(),
        domain_id: domain_id.clone(),
        ..ProvisionedDomain::default()
    };

    for test in &topology.tests {
        let test_id = session
            .create(
                ResourceKind::Test,
                &TestPayload {
                    name: test.name.clone(),
                    subpath: test.subpath.clone(),
                    active: true,
                    description: test.description.clone().unwrap_or_default(),
                    domain: DomainRef {
                        domain_id: domain_id.clone(),
                    },
                },
            )
            .await?;
        info!("Created test {} on {} (id {})", test.name, test.subpath, test_id);
        provisioned.test_ids.insert(test.name.clone(), test_id);
    }

    for binding in &bound.bindings {
        let test_id = provisioned
            .test_ids
            .get(&binding.test_name)
            .cloned()
            .ok_or_else(|| HarnessError::UnprovisionedTest {
                test: binding.test_name.clone(),
                variant: binding.variant_name.clone(),
            })?;
        let variant_id = session
            .create(
                ResourceKind::Variant,
                &VariantPayload {
                    name: binding.variant_name.clone(),
                    weight: binding.weight,
                    active: true,
                    description: format!("{} variant", binding.variant_name),
                    test: TestRef { test_id },
                },
            )
            .await?;
        info!(
            "Created variant {} (weight {}, id {})",
            binding.variant_name, binding.weight, variant_id
        );

        for origin in &binding.origins {
            let payload =
                EndpointPayload::for_variant(origin_url(origin), &variant_id, origin.to_string());
            let url = session.create(ResourceKind::Endpoint, &payload).await?;
            debug!("Created endpoint {} for {}", url, binding.variant_name);
            provisioned.endpoint_urls.push(payload.url);
        }
        provisioned.variant_ids.insert(binding.key(), variant_id);
    }

    for origin in &bound.fallback {
        let payload = EndpointPayload::for_domain(
            origin_url(origin),
            &domain_id,
            format!("Default endpoint {origin}"),
        );
        session.create(ResourceKind::Endpoint, &payload).await?;
        debug!("Created fallback endpoint {}", payload.url);
        provisioned.endpoint_urls.push(payload.url);
    }

    info!(
        "Provisioned {} test(s), {} variant(s), {} endpoint(s)",
        provisioned.test_ids.len(),
        provisioned.variant_ids.len(),
        provisioned.endpoint_urls.len()
    );
    Ok(provisioned)
}

/// Remove the domain created by [`provision`]
pub async fn teardown(
    session: &ProvisioningSession,
    provisioned: &ProvisionedDomain,
) -> HarnessResult<()> {
    session
        .delete(ResourceKind::Domain, &provisioned.domain_id)
        .await?;
    info!(
        "Removed domain {} (id {})",
        provisioned.host, provisioned.domain_id
    );
    Ok(())
}
