//! Provisioning session, topology provisioning and readiness against the
//! fake router's admin API

mod support;

use anyhow::Result;
use splitprobe_config::ReadinessConfig;
use splitprobe_core::{OriginIdentity, VariantKey};
use splitprobe_harness::provision::{provision, teardown};
use splitprobe_harness::readiness::wait_until_alive;
use splitprobe_harness::{bind_topology, requested_origins, HarnessError};
use splitprobe_http::{
    Credentials, DomainPayload, EndpointPayload, HttpManager, ProvisionError, ProvisioningClient,
    ProvisioningSession, ResourceKind,
};
use std::time::Duration;
use support::FakeRouter;

async fn session(router: &FakeRouter) -> Result<ProvisioningSession> {
    let session = ProvisioningClient::new(router.admin_url(), &HttpManager::new())?
        .authenticate(&Credentials {
            username: "admin".to_string(),
            password: "admin".to_string(),
        })
        .await?;
    Ok(session)
}

/// Default topology with made-up ports; nothing needs to listen on them
fn bound_origins() -> Vec<OriginIdentity> {
    let topology = splitprobe_config::TopologyConfig::default();
    requested_origins(&topology)
}

#[tokio::test]
async fn test_ensure_clean_twice_is_a_noop_the_second_time() -> Result<()> {
    let router = FakeRouter::start().await;
    router.seed_domain("sklep.pl");
    router.seed_domain("other.pl");
    let session = session(&router).await?;

    assert_eq!(session.ensure_clean("sklep.pl").await?, 1);
    assert_eq!(session.ensure_clean("sklep.pl").await?, 0);
    assert_eq!(router.domain_hosts(), vec!["other.pl".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_domain_is_rejected_with_snippet() -> Result<()> {
    let router = FakeRouter::start().await;
    let session = session(&router).await?;
    let payload = DomainPayload {
        host: "sklep.pl".to_string(),
        active: true,
        description: "first".to_string(),
    };

    session.create(ResourceKind::Domain, &payload).await?;
    let err = session
        .create(ResourceKind::Domain, &payload)
        .await
        .unwrap_err();

    match err {
        ProvisionError::Create { kind, status, body } => {
            assert_eq!(kind, "domains");
            assert_eq!(status, 409);
            assert!(body.contains("already exists"));
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_provision_and_teardown_default_topology() -> Result<()> {
    let router = FakeRouter::start().await;
    let session = session(&router).await?;
    let topology = splitprobe_config::TopologyConfig::default();
    let bound = bind_topology(&topology, &bound_origins(), "127.0.0.1")?;

    let provisioned = provision(&session, "sklep.pl", &topology, &bound, |origin| {
        format!("http://127.0.0.1:{}", origin.port())
    })
    .await?;

    assert_eq!(router.resource_counts(), (1, 2, 5, 12));
    assert_eq!(provisioned.test_ids.len(), 2);
    assert!(provisioned
        .variant_ids
        .contains_key(&VariantKey::new("User Page Test", "User-Variant-C")));
    assert!(router
        .endpoint_urls()
        .contains(&"http://127.0.0.1:9101".to_string()));

    let liveness = session.endpoint_liveness().await?;
    assert_eq!(liveness.len(), 12);
    assert!(liveness.values().all(|alive| *alive));

    teardown(&session, &provisioned).await?;
    assert_eq!(router.resource_counts(), (0, 0, 0, 0));
    // Deleting again is tolerated
    teardown(&session, &provisioned).await?;
    Ok(())
}

#[tokio::test]
async fn test_variant_of_missing_test_aborts_provisioning() -> Result<()> {
    let router = FakeRouter::start().await;
    let session = session(&router).await?;
    let full = splitprobe_config::TopologyConfig::default();
    let bound = bind_topology(&full, &bound_origins(), "127.0.0.1")?;

    // Only the cart test is declared, yet user page bindings are present
    let mut partial = full.clone();
    partial.tests.truncate(1);
    let err = provision(&session, "sklep.pl", &partial, &bound, |origin| {
        format!("http://127.0.0.1:{}", origin.port())
    })
    .await
    .unwrap_err();

    match err {
        HarnessError::UnprovisionedTest { test, variant } => {
            assert_eq!(test, "User Page Test");
            assert_eq!(variant, "User-Variant-A");
        }
        other => panic!("unexpected error: {other}"),
    }
    let (_, tests, variants, _) = router.resource_counts();
    assert_eq!((tests, variants), (1, 2));
    Ok(())
}

#[tokio::test]
async fn test_endpoint_deleted_by_url() -> Result<()> {
    let router = FakeRouter::start().await;
    let session = session(&router).await?;
    let domain_id = session
        .create(
            ResourceKind::Domain,
            &DomainPayload {
                host: "sklep.pl".to_string(),
                active: true,
                description: String::new(),
            },
        )
        .await?;
    session
        .create(
            ResourceKind::Endpoint,
            &EndpointPayload::for_domain("http://127.0.0.1:9100", &domain_id, "fallback"),
        )
        .await?;

    assert_eq!(router.endpoint_urls(), vec!["http://127.0.0.1:9100".to_string()]);
    session
        .delete(ResourceKind::Endpoint, "http://127.0.0.1:9100")
        .await?;
    assert!(router.endpoint_urls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_readiness_passes_once_endpoints_alive() -> Result<()> {
    let router = FakeRouter::start().await;
    let session = session(&router).await?;
    let topology = splitprobe_config::TopologyConfig::default();
    let bound = bind_topology(&topology, &bound_origins(), "127.0.0.1")?;
    let provisioned = provision(&session, "sklep.pl", &topology, &bound, |origin| {
        format!("http://127.0.0.1:{}", origin.port())
    })
    .await?;

    let config = ReadinessConfig {
        enabled: true,
        poll_interval: Duration::from_millis(10),
        deadline: Duration::from_secs(1),
    };
    wait_until_alive(&session, &provisioned.endpoint_urls, &config).await?;
    Ok(())
}

#[tokio::test]
async fn test_wrong_password_is_rejected() -> Result<()> {
    let router = FakeRouter::start().await;
    let err = ProvisioningClient::new(router.admin_url(), &HttpManager::new())?
        .authenticate(&Credentials {
            username: "admin".to_string(),
            password: "nope".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::Auth(_)), "{err}");
    assert_eq!(router.logins(), 0);
    Ok(())
}
