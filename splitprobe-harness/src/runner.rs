//! Run orchestration
//!
//! A run starts the mock origin fleet, checks the router is reachable,
//! removes stale state for the domain, provisions the topology, waits for
//! the router to see every origin alive and then executes the selected
//! scenarios. The fleet is always stopped at the end, whether the run
//! succeeded or not.

use crate::error::HarnessResult;
use crate::provision::{provision, teardown, ProvisionedDomain};
use crate::readiness::wait_until_alive;
use crate::report::RunReport;
use crate::scenarios::{run_scenario, ScenarioContext, ScenarioKind};
use crate::topology::{bind_topology, requested_origins, BoundTopology};
use chrono::Utc;
use splitprobe_config::{ProbeConfig, ScenariosConfig};
use splitprobe_core::RequestLedger;
use splitprobe_http::{Credentials, HttpManager, ProvisioningClient, ProvisioningSession};
use splitprobe_origins::{FleetHandle, FleetSettings, MockOriginFleet};
use splitprobe_traffic::TrafficSimulator;
use tracing::{error, info, warn};

/// Entry point for a verification run
#[derive(Debug, Clone)]
pub struct Harness {
    config: ProbeConfig,
    http: HttpManager,
    ledger: RequestLedger,
}

impl Harness {
    pub fn new(config: ProbeConfig) -> HarnessResult<Self> {
        config.validate_all()?;
        let http = HttpManager::with_config(config.http.clone().into());
        Ok(Self {
            config,
            http,
            ledger: RequestLedger::new(),
        })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn ledger(&self) -> &RequestLedger {
        &self.ledger
    }

    /// Start every origin the topology declares
    pub async fn start_fleet(&self) -> HarnessResult<FleetHandle> {
        let fleet = MockOriginFleet::new(
            FleetSettings::from(&self.config.origins),
            self.ledger.clone(),
        );
        let handle = fleet
            .start(&requested_origins(&self.config.topology))
            .await?;
        Ok(handle)
    }

    /// Bring the fleet up and the router into a known state. On failure the
    /// fleet is stopped before the error is returned.
    pub async fn prepare(&self) -> HarnessResult<PreparedRun> {
        let fleet = self.start_fleet().await?;
        match self.wire(&fleet).await {
            Ok(wiring) => Ok(PreparedRun {
                fleet,
                wiring,
                ledger: self.ledger.clone(),
                settings: self.config.scenarios.clone(),
                router_url: self.config.router.base_url.clone(),
                domain_host: self.config.router.domain_host.clone(),
                teardown: self.config.admin.teardown,
            }),
            Err(e) => {
                fleet.stop().await;
                Err(e)
            }
        }
    }

    /// Prepare, run the selected scenarios and finish, stopping the fleet
    /// on every path
    pub async fn run(&self, selection: &[ScenarioKind]) -> HarnessResult<RunReport> {
        let mut prepared = self.prepare().await?;
        let result = prepared.run_scenarios(selection).await;
        let finished = prepared.finish().await;
        let report = result?;
        finished?;
        Ok(report)
    }

    async fn wire(&self, fleet: &FleetHandle) -> HarnessResult<Wiring> {
        let config = &self.config;
        let topology = bind_topology(
            &config.topology,
            &fleet.identities(),
            &config.origins.public_host,
        )?;

        let simulator = TrafficSimulator::new(
            self.http.clone(),
            &config.router.base_url,
            config.router.domain_host.clone(),
        )?;
        simulator.probe().await?;

        let session = ProvisioningClient::new(&config.admin.base_url, &self.http)?
            .authenticate(&Credentials {
                username: config.admin.username.clone(),
                password: config.admin.password.clone(),
            })
            .await?;

        let removed_domains = session.ensure_clean(&config.router.domain_host).await?;
        if removed_domains > 0 {
            info!(
                "Removed {} stale domain(s) for {}",
                removed_domains, config.router.domain_host
            );
        }

        let provisioned = provision(
            &session,
            &config.router.domain_host,
            &config.topology,
            &topology,
            |origin| config.origins.origin_url(origin.port()),
        )
        .await?;

        wait_until_alive(
            &session,
            &provisioned.endpoint_urls,
            &config.admin.readiness,
        )
        .await?;

        Ok(Wiring {
            topology,
            session,
            simulator,
            provisioned,
            removed_domains,
        })
    }
}

struct Wiring {
    topology: BoundTopology,
    session: ProvisioningSession,
    simulator: TrafficSimulator,
    provisioned: ProvisionedDomain,
    removed_domains: usize,
}

/// A provisioned router with a running fleet, ready for scenarios
pub struct PreparedRun {
    fleet: FleetHandle,
    wiring: Wiring,
    ledger: RequestLedger,
    settings: ScenariosConfig,
    router_url: String,
    domain_host: String,
    teardown: bool,
}

impl std::fmt::Debug for PreparedRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedRun")
            .field("fleet", &self.fleet)
            .field("domain_host", &self.domain_host)
            .field("provisioned", &self.wiring.provisioned)
            .finish()
    }
}

impl PreparedRun {
    pub fn fleet(&self) -> &FleetHandle {
        &self.fleet
    }

    pub fn topology(&self) -> &BoundTopology {
        &self.wiring.topology
    }

    pub fn provisioned(&self) -> &ProvisionedDomain {
        &self.wiring.provisioned
    }

    pub fn removed_domains(&self) -> usize {
        self.wiring.removed_domains
    }

    /// Run the selected scenarios (all when empty) in canonical order
    pub async fn run_scenarios(&mut self, selection: &[ScenarioKind]) -> HarnessResult<RunReport> {
        let started_at = Utc::now();
        let mut scenarios = Vec::new();

        let mut ctx = ScenarioContext {
            simulator: &self.wiring.simulator,
            topology: &self.wiring.topology,
            ledger: &self.ledger,
            fleet: &mut self.fleet,
            settings: &self.settings,
        };
        for kind in ScenarioKind::selection(selection) {
            match run_scenario(kind, &mut ctx).await {
                Ok(report) => scenarios.push(report),
                Err(e) => {
                    error!("Scenario {} aborted: {}", kind, e);
                    return Err(e);
                }
            }
        }

        Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            router_url: self.router_url.clone(),
            domain_host: self.domain_host.clone(),
            removed_domains: self.wiring.removed_domains,
            scenarios,
        })
    }

    /// Keep the fleet serving until `shutdown` resolves
    pub async fn serve_until<F>(&self, shutdown: F)
    where
        F: std::future::Future<Output = ()>,
    {
        info!(
            "Serving {} origin(s) for {}",
            self.fleet.len(),
            self.domain_host
        );
        shutdown.await;
    }

    /// Tear the provisioned domain down when configured, then stop the fleet
    pub async fn finish(self) -> HarnessResult<()> {
        let result = if self.teardown {
            teardown(&self.wiring.session, &self.wiring.provisioned).await
        } else {
            info!(
                "Leaving domain {} provisioned (id {})",
                self.wiring.provisioned.host, self.wiring.provisioned.domain_id
            );
            Ok(())
        };
        if let Err(e) = &result {
            warn!("Teardown failed: {}", e);
        }
        self.fleet.stop().await;
        result
    }
}
