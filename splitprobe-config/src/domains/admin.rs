//! Provisioning (admin) API configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Admin API used to provision domains, tests, variants and endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Base URL of the admin API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Login name
    #[serde(default = "default_username")]
    pub username: String,

    /// Password
    #[serde(default = "default_password")]
    pub password: String,

    /// Delete the provisioned domain once a run completes
    #[serde(default = "crate::domains::utils::default_false")]
    pub teardown: bool,

    /// Readiness polling against the endpoint health flags
    #[serde(default)]
    pub readiness: ReadinessConfig,
}

/// Bounded polling until the router reports every provisioned origin alive
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    #[serde(default = "crate::domains::utils::default_true")]
    pub enabled: bool,

    /// Delay between two polls
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_poll_interval"
    )]
    pub poll_interval: Duration,

    /// Give up after this long
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_deadline"
    )]
    pub deadline: Duration,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            username: default_username(),
            password: default_password(),
            teardown: false,
            readiness: ReadinessConfig::default(),
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: default_poll_interval(),
            deadline: default_deadline(),
        }
    }
}

impl Validatable for AdminConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_url(&self.base_url, "base_url", self.domain_name())?;
        validate_required_string(&self.username, "username", self.domain_name())?;
        validate_required_string(&self.password, "password", self.domain_name())?;
        self.readiness.validate()
    }

    fn domain_name(&self) -> &'static str {
        "admin"
    }
}

impl Validatable for ReadinessConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !self.enabled {
            return Ok(());
        }
        validate_positive(
            self.poll_interval.as_millis(),
            "poll_interval",
            self.domain_name(),
        )?;
        validate_positive(self.deadline.as_secs(), "deadline", self.domain_name())?;
        if self.poll_interval >= self.deadline {
            return Err(self.validation_error("poll_interval must be shorter than deadline"));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "admin.readiness"
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_password() -> String {
    "admin".to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(1000)
}

fn default_deadline() -> Duration {
    Duration::from_secs(35)
}
