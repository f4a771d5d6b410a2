//! Mock origin fleet configuration

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// How the mock origins bind and how the router should reach them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginsConfig {
    /// Address every origin listener binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Host name put into provisioned endpoint URLs (`http://<public_host>:<port>`)
    #[serde(default = "default_public_host")]
    pub public_host: String,

    /// Bounded wait for in-flight connections when the fleet stops
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_shutdown_grace"
    )]
    pub shutdown_grace: Duration,

    /// Attach a per-request tracing layer to every origin
    #[serde(default = "crate::domains::utils::default_false")]
    pub trace_requests: bool,
}

impl Default for OriginsConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            public_host: default_public_host(),
            shutdown_grace: default_shutdown_grace(),
            trace_requests: false,
        }
    }
}

impl OriginsConfig {
    /// Base URL the router uses to reach an origin bound on `port`
    pub fn origin_url(&self, port: u16) -> String {
        format!("http://{}:{}", self.public_host, port)
    }
}

impl Validatable for OriginsConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.public_host, "public_host", self.domain_name())?;
        if self.shutdown_grace.is_zero() {
            return Err(self.validation_error("shutdown_grace must be greater than 0"));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "origins"
    }
}

fn default_bind_address() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_public_host() -> String {
    "localhost".to_string()
}

fn default_shutdown_grace() -> Duration {
    Duration::from_millis(500)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_url() {
        let config = OriginsConfig::default();
        assert_eq!(config.origin_url(9001), "http://localhost:9001");
    }

    #[test]
    fn test_zero_grace_rejected() {
        let config = OriginsConfig {
            shutdown_grace: Duration::ZERO,
            ..OriginsConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
