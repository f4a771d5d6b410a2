//! Simulated traffic through the fake router to a live mock origin fleet

mod support;

use anyhow::Result;
use splitprobe_core::{parse_origin_body, Outcome, OutcomeClassifier, OriginSignal};
use splitprobe_harness::Harness;
use splitprobe_http::{HttpConfig, HttpManager, RedirectMode};
use splitprobe_traffic::TrafficSimulator;
use std::time::Duration;
use support::FakeRouter;

fn simulator(router: &FakeRouter) -> Result<TrafficSimulator> {
    let http = HttpManager::with_config(HttpConfig {
        timeout: Duration::from_secs(2),
        connect_timeout: Duration::from_secs(1),
        ..HttpConfig::default()
    });
    Ok(TrafficSimulator::new(http, router.router_url(), "sklep.pl")?)
}

#[tokio::test]
async fn test_unknown_path_goes_to_fallback_origins() -> Result<()> {
    let router = FakeRouter::start().await;
    let harness = Harness::new(router.probe_config())?;
    let prepared = harness.prepare().await?;
    let simulator = simulator(&router)?;
    let classifier = OutcomeClassifier::new(&prepared.topology().table);

    let observations = simulator.anonymous_burst("/checkout", 4, 1).await;
    let outcomes = classifier.classify_all(&observations);

    let mut fallback: Vec<&str> = outcomes
        .iter()
        .map(|outcome| match outcome {
            Outcome::Fallback { origin } => origin.name(),
            other => panic!("expected fallback, got {other:?}"),
        })
        .collect();
    fallback.sort();
    assert_eq!(
        fallback,
        vec![
            "domain_default_1",
            "domain_default_1",
            "domain_default_2",
            "domain_default_2"
        ]
    );

    prepared.finish().await?;
    Ok(())
}

#[tokio::test]
async fn test_followed_bodies_agree_with_ledger() -> Result<()> {
    let router = FakeRouter::start().await;
    let harness = Harness::new(router.probe_config())?;
    let prepared = harness.prepare().await?;
    let simulator = simulator(&router)?;
    let classifier = OutcomeClassifier::new(&prepared.topology().table);
    harness.ledger().reset();

    let (_, observations) = simulator.follow_actor("/user", 12).await?;
    let outcomes = classifier.classify_all(&observations);

    assert!(outcomes.iter().all(|o| !o.is_unresolved()), "{outcomes:?}");
    for origin in outcomes.iter().filter_map(Outcome::origin) {
        let classified = outcomes
            .iter()
            .filter(|o| o.origin() == Some(origin))
            .count() as u64;
        assert_eq!(harness.ledger().count(origin.name()), classified);
    }
    assert_eq!(harness.ledger().total(), 12);

    prepared.finish().await?;
    Ok(())
}

#[tokio::test]
async fn test_origin_sees_full_path_and_query() -> Result<()> {
    let router = FakeRouter::start().await;
    let harness = Harness::new(router.probe_config())?;
    let prepared = harness.prepare().await?;
    let simulator = simulator(&router)?;

    let user = simulator.new_user(RedirectMode::Follow)?;
    let observation = user.request("/cart/items?ref=mail").await;

    let OriginSignal::Body { text } = &observation.signal else {
        panic!("expected a body, got {:?}", observation.signal);
    };
    let body = parse_origin_body(text).expect("origin body");
    assert!(body.name.starts_with("cart_v"));
    assert_eq!(body.path.as_deref(), Some("/cart/items?ref=mail"));
    assert_eq!(observation.status, Some(200));

    prepared.finish().await?;
    Ok(())
}

#[tokio::test]
async fn test_foreign_host_gets_no_route() -> Result<()> {
    let router = FakeRouter::start().await;
    let harness = Harness::new(router.probe_config())?;
    let prepared = harness.prepare().await?;
    let http = HttpManager::new();
    let stranger = TrafficSimulator::new(http, router.router_url(), "example.org")?;
    let classifier = OutcomeClassifier::new(&prepared.topology().table);

    let observations = stranger.anonymous_burst("/cart", 2, 2).await;
    assert!(observations.iter().all(|o| o.status == Some(404)));
    assert!(classifier
        .classify_all(&observations)
        .iter()
        .all(Outcome::is_unresolved));

    prepared.finish().await?;
    Ok(())
}
