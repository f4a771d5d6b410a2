//! Domain-specific configuration modules

pub mod admin;
pub mod http;
pub mod logging;
pub mod origins;
pub mod router;
pub mod scenarios;
pub mod topology;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main splitprobe configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProbeConfig {
    /// HTTP client configuration
    #[serde(default)]
    pub http: http::HttpConfig,

    /// Provisioning API configuration
    #[serde(default)]
    pub admin: admin::AdminConfig,

    /// Router under test
    #[serde(default)]
    pub router: router::RouterConfig,

    /// Mock origin fleet
    #[serde(default)]
    pub origins: origins::OriginsConfig,

    /// Tests, variants and origins to provision
    #[serde(default)]
    pub topology: topology::TopologyConfig,

    /// Scenario sample sizes and bounds
    #[serde(default)]
    pub scenarios: scenarios::ScenariosConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl ProbeConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.http.validate()?;
        self.admin.validate()?;
        self.router.validate()?;
        self.origins.validate()?;
        self.topology.validate()?;
        self.scenarios.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = ProbeConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
