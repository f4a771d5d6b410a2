//! Traffic generator

use crate::error::TrafficError;
use crate::user::{observe, SimulatedUser};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use splitprobe_core::{ActorId, Observation};
use splitprobe_http::{ClientOptions, HttpManager, RedirectMode};
use tracing::{debug, info};
use url::Url;

/// Issues requests to the router with `Host: <domain>` on every request
#[derive(Debug, Clone)]
pub struct TrafficSimulator {
    http: HttpManager,
    router_url: Url,
    domain_host: String,
    anonymous: Client,
}

impl TrafficSimulator {
    pub fn new(
        http: HttpManager,
        router_url: &str,
        domain_host: impl Into<String>,
    ) -> Result<Self, TrafficError> {
        let router_url = Url::parse(router_url).map_err(|e| TrafficError::InvalidUrl {
            url: router_url.to_string(),
            reason: e.to_string(),
        })?;
        let domain_host = domain_host.into();

        let anonymous = http.build(&ClientOptions {
            redirects: RedirectMode::Manual,
            cookies: false,
            host: Some(domain_host.clone()),
        })?;

        Ok(Self {
            http,
            router_url,
            domain_host,
            anonymous,
        })
    }

    pub fn router_url(&self) -> &Url {
        &self.router_url
    }

    pub fn domain_host(&self) -> &str {
        &self.domain_host
    }

    /// Check the router accepts connections. Any HTTP response counts.
    pub async fn probe(&self) -> Result<(), TrafficError> {
        match self.anonymous.get(self.router_url.clone()).send().await {
            Ok(response) => {
                debug!(
                    "Router at {} answered probe with {}",
                    self.router_url,
                    response.status()
                );
                Ok(())
            }
            Err(source) => Err(TrafficError::Unreachable {
                url: self.router_url.to_string(),
                source,
            }),
        }
    }

    /// `count` cookie-less requests to `subpath` with redirects disabled,
    /// at most `concurrency` in flight. Results are in completion order.
    pub async fn anonymous_burst(
        &self,
        subpath: &str,
        count: usize,
        concurrency: usize,
    ) -> Vec<Observation> {
        info!(
            "Sending {} anonymous request(s) to {} (concurrency {})",
            count,
            subpath,
            concurrency.max(1)
        );
        stream::iter(0..count)
            .map(|_| {
                observe(
                    &self.anonymous,
                    &self.router_url,
                    subpath,
                    ActorId::Anonymous,
                    RedirectMode::Manual,
                )
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await
    }

    /// A fresh persistent user with its own cookie jar
    pub fn new_user(&self, mode: RedirectMode) -> Result<SimulatedUser, TrafficError> {
        let client = self.http.build(&ClientOptions {
            redirects: mode,
            cookies: true,
            host: Some(self.domain_host.clone()),
        })?;
        let user = SimulatedUser::new(ActorId::new_user(), client, mode, self.router_url.clone());
        debug!("Created simulated user {} ({:?})", user.id(), mode);
        Ok(user)
    }

    /// `n` independent persistent users
    pub fn actors(&self, n: usize, mode: RedirectMode) -> Result<Vec<SimulatedUser>, TrafficError> {
        (0..n).map(|_| self.new_user(mode)).collect()
    }

    /// One user, `count` requests reusing its jar, redirects disabled
    pub async fn sticky_actor(
        &self,
        subpath: &str,
        count: usize,
    ) -> Result<(SimulatedUser, Vec<Observation>), TrafficError> {
        let user = self.new_user(RedirectMode::Manual)?;
        let observations = user.repeat(subpath, count).await;
        Ok((user, observations))
    }

    /// One user, `count` requests following redirects to the origin body
    pub async fn follow_actor(
        &self,
        subpath: &str,
        count: usize,
    ) -> Result<(SimulatedUser, Vec<Observation>), TrafficError> {
        let user = self.new_user(RedirectMode::Follow)?;
        let observations = user.repeat(subpath, count).await;
        Ok((user, observations))
    }
}
