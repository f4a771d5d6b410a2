//! Starting and stopping the mock origin fleet

use crate::error::FleetError;
use crate::handler::{serve_origin, OriginState};
use axum::Router;
use splitprobe_config::OriginsConfig;
use splitprobe_core::{OriginIdentity, RequestLedger};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Listener settings for a fleet
#[derive(Debug, Clone)]
pub struct FleetSettings {
    pub bind_address: IpAddr,
    /// Host used when advertising origin URLs
    pub public_host: String,
    /// How long a stopping listener may drain before it is aborted
    pub shutdown_grace: Duration,
    pub trace_requests: bool,
}

impl Default for FleetSettings {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            public_host: "localhost".to_string(),
            shutdown_grace: Duration::from_millis(500),
            trace_requests: false,
        }
    }
}

impl From<&OriginsConfig> for FleetSettings {
    fn from(config: &OriginsConfig) -> Self {
        Self {
            bind_address: config.bind_address,
            public_host: config.public_host.clone(),
            shutdown_grace: config.shutdown_grace,
            trace_requests: config.trace_requests,
        }
    }
}

/// Factory for running fleets that all record into one ledger
#[derive(Debug, Clone)]
pub struct MockOriginFleet {
    settings: FleetSettings,
    ledger: RequestLedger,
}

impl MockOriginFleet {
    pub fn new(settings: FleetSettings, ledger: RequestLedger) -> Self {
        Self { settings, ledger }
    }

    pub fn ledger(&self) -> &RequestLedger {
        &self.ledger
    }

    /// Bind one listener per requested origin and start serving.
    ///
    /// A requested port of `0` binds an ephemeral port; the returned handle
    /// reports the port actually bound. If any bind fails, listeners already
    /// started are stopped and the failure names the origin and port.
    pub async fn start(&self, requested: &[OriginIdentity]) -> Result<FleetHandle, FleetError> {
        let mut seen = HashSet::new();
        for origin in requested {
            if !seen.insert(origin.name()) {
                return Err(FleetError::DuplicateOrigin(origin.name().to_string()));
            }
        }

        let mut handle = FleetHandle {
            origins: Vec::with_capacity(requested.len()),
            fleet: self.clone(),
        };

        for origin in requested {
            match self.spawn_origin(origin).await {
                Ok(running) => handle.origins.push(running),
                Err(e) => {
                    warn!("Fleet start failed, stopping {} started origin(s)", handle.origins.len());
                    handle.stop().await;
                    return Err(e);
                }
            }
        }

        info!(
            "Mock origin fleet started: {} origin(s) on {}",
            handle.origins.len(),
            self.settings.bind_address
        );
        Ok(handle)
    }

    async fn spawn_origin(&self, requested: &OriginIdentity) -> Result<RunningOrigin, FleetError> {
        let bind_error = |source| FleetError::Bind {
            name: requested.name().to_string(),
            port: requested.port(),
            source,
        };

        let addr = SocketAddr::new(self.settings.bind_address, requested.port());
        let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
        let port = listener.local_addr().map_err(bind_error)?.port();
        let identity = OriginIdentity::new(requested.name(), port);

        let state = OriginState {
            identity: Arc::new(identity.clone()),
            ledger: self.ledger.clone(),
        };
        let app = Router::new().fallback(serve_origin).with_state(state);
        let app = if self.settings.trace_requests {
            app.layer(TraceLayer::new_for_http())
        } else {
            app
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let name = identity.name().to_string();
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                // A dropped sender also counts as a stop request
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                warn!("Origin {} stopped with error: {}", name, e);
            }
        });

        debug!("Origin {} listening", identity);
        Ok(RunningOrigin {
            identity,
            shutdown: Some(shutdown_tx),
            task,
        })
    }
}

struct RunningOrigin {
    identity: OriginIdentity,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RunningOrigin {
    fn signal(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    fn is_running(&self) -> bool {
        self.shutdown.is_some()
    }
}

/// A running fleet. Listener tasks are detached; dropping the handle signals
/// them to stop without waiting.
pub struct FleetHandle {
    origins: Vec<RunningOrigin>,
    fleet: MockOriginFleet,
}

impl std::fmt::Debug for FleetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetHandle")
            .field("origins", &self.identities())
            .field("grace", &self.fleet.settings.shutdown_grace)
            .finish()
    }
}

impl FleetHandle {
    /// Identities of every origin started, with their bound ports
    pub fn identities(&self) -> Vec<OriginIdentity> {
        self.origins.iter().map(|o| o.identity.clone()).collect()
    }

    pub fn identity(&self, name: &str) -> Option<&OriginIdentity> {
        self.origins
            .iter()
            .map(|o| &o.identity)
            .find(|identity| identity.name() == name)
    }

    /// URL the router should redirect to for `name`
    pub fn url(&self, name: &str) -> Option<String> {
        self.identity(name)
            .map(|identity| format!("http://{}:{}", self.fleet.settings.public_host, identity.port()))
    }

    pub fn ledger(&self) -> &RequestLedger {
        &self.fleet.ledger
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.origins
            .iter()
            .any(|o| o.identity.name() == name && o.is_running())
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    /// Take a single origin offline; its port stops accepting connections
    pub async fn stop_origin(&mut self, name: &str) -> Result<(), FleetError> {
        let grace = self.fleet.settings.shutdown_grace;
        let origin = self
            .origins
            .iter_mut()
            .find(|o| o.identity.name() == name)
            .ok_or_else(|| FleetError::UnknownOrigin(name.to_string()))?;

        origin.signal();
        drain(&mut origin.task, grace, &origin.identity).await;
        info!("Origin {} taken offline", origin.identity);
        Ok(())
    }

    /// Bring a stopped origin back on the port it had before
    pub async fn restart_origin(&mut self, name: &str) -> Result<(), FleetError> {
        let index = self
            .origins
            .iter()
            .position(|o| o.identity.name() == name)
            .ok_or_else(|| FleetError::UnknownOrigin(name.to_string()))?;
        if self.origins[index].is_running() {
            return Ok(());
        }

        let identity = self.origins[index].identity.clone();
        let restarted = self.fleet.spawn_origin(&identity).await?;
        self.origins[index] = restarted;
        info!("Origin {} back online", identity);
        Ok(())
    }

    /// Signal every listener, wait up to the grace period, then abort stragglers
    pub async fn stop(mut self) {
        for origin in &mut self.origins {
            origin.signal();
        }

        let deadline = tokio::time::Instant::now() + self.fleet.settings.shutdown_grace;
        for origin in &mut self.origins {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            drain(&mut origin.task, remaining, &origin.identity).await;
        }
        info!("Mock origin fleet stopped");
    }
}

async fn drain(task: &mut JoinHandle<()>, grace: Duration, identity: &OriginIdentity) {
    if task.is_finished() {
        return;
    }
    if tokio::time::timeout(grace, &mut *task).await.is_err() {
        debug!("Origin {} did not drain within {:?}, aborting", identity, grace);
        task.abort();
    }
}

impl Drop for FleetHandle {
    fn drop(&mut self) {
        for origin in &mut self.origins {
            origin.signal();
        }
    }
}
