//! Router-under-test configuration

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};

/// Where the router listens and which virtual host the traffic targets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Base URL requests are sent to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Value of the `Host` header on simulated traffic
    #[serde(default = "default_domain_host")]
    pub domain_host: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            domain_host: default_domain_host(),
        }
    }
}

impl Validatable for RouterConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_url(&self.base_url, "base_url", self.domain_name())?;
        validate_required_string(&self.domain_host, "domain_host", self.domain_name())?;
        if self.domain_host.contains('/') || self.domain_host.contains(char::is_whitespace) {
            return Err(self.validation_error(format!(
                "domain_host must be a bare host name, got '{}'",
                self.domain_host
            )));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "router"
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_domain_host() -> String {
    "sklep.pl".to_string()
}
