//! A single simulated actor and the request/observe step shared by all actors

use reqwest::{header::LOCATION, Client};
use splitprobe_core::{ActorId, FailureKind, Observation, RequestFailure};
use splitprobe_http::RedirectMode;
use tracing::trace;
use url::Url;

/// A persistent user. Identity is the cookie jar inside `client`: two
/// users are the same iff they share the client.
#[derive(Debug, Clone)]
pub struct SimulatedUser {
    id: ActorId,
    client: Client,
    mode: RedirectMode,
    router_url: Url,
}

impl SimulatedUser {
    pub(crate) fn new(id: ActorId, client: Client, mode: RedirectMode, router_url: Url) -> Self {
        Self {
            id,
            client,
            mode,
            router_url,
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn mode(&self) -> RedirectMode {
        self.mode
    }

    /// One `GET` to `subpath` carrying this user's cookies
    pub async fn request(&self, subpath: &str) -> Observation {
        observe(&self.client, &self.router_url, subpath, self.id, self.mode).await
    }

    /// `count` sequential requests to `subpath`
    pub async fn repeat(&self, subpath: &str, count: usize) -> Vec<Observation> {
        let mut observations = Vec::with_capacity(count);
        for _ in 0..count {
            observations.push(self.request(subpath).await);
        }
        observations
    }
}

/// Issue one request and turn whatever happens into an observation
pub(crate) async fn observe(
    client: &Client,
    router_url: &Url,
    subpath: &str,
    actor: ActorId,
    mode: RedirectMode,
) -> Observation {
    let url = match router_url.join(subpath) {
        Ok(url) => url,
        Err(e) => {
            return Observation::failed(
                subpath,
                actor,
                RequestFailure {
                    kind: FailureKind::Other,
                    detail: format!("invalid subpath: {e}"),
                },
            )
        }
    };

    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return Observation::failed(subpath, actor, failure_from(&e)),
    };

    let status = response.status().as_u16();
    trace!(%actor, subpath, status, "router responded");

    match mode {
        RedirectMode::Manual => {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            Observation::redirect(subpath, actor, status, location)
        }
        RedirectMode::Follow => match response.text().await {
            Ok(text) => Observation::body(subpath, actor, status, text),
            Err(e) => Observation::failed(subpath, actor, failure_from(&e)),
        },
    }
}

fn failure_from(error: &reqwest::Error) -> RequestFailure {
    let kind = if error.is_timeout() {
        FailureKind::Timeout
    } else if error.is_connect() {
        FailureKind::Connect
    } else if error.is_redirect() {
        FailureKind::Redirect
    } else {
        FailureKind::Other
    };
    RequestFailure {
        kind,
        detail: error.to_string(),
    }
}
