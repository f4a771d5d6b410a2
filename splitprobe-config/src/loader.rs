//! Configuration loading and environment variable handling

use crate::domains::ProbeConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "SPLITPROBE".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<ProbeConfig> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let mut config: ProbeConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<ProbeConfig> {
        let mut config = ProbeConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<ProbeConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut ProbeConfig) -> ConfigResult<()> {
        self.apply_http_overrides(&mut config.http)?;
        self.apply_admin_overrides(&mut config.admin);
        self.apply_router_overrides(&mut config.router);
        self.apply_origin_overrides(&mut config.origins);
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    fn apply_http_overrides(
        &self,
        config: &mut crate::domains::http::HttpConfig,
    ) -> ConfigResult<()> {
        if let Ok(timeout) = self.get_env_var("HTTP_TIMEOUT") {
            let seconds: u64 = timeout
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid HTTP_TIMEOUT: {}", e)))?;
            config.timeout = Duration::from_secs(seconds);
        }

        if let Ok(user_agent) = self.get_env_var("HTTP_USER_AGENT") {
            config.user_agent = user_agent;
        }

        Ok(())
    }

    fn apply_admin_overrides(&self, config: &mut crate::domains::admin::AdminConfig) {
        if let Ok(url) = self.get_env_var("ADMIN_URL") {
            config.base_url = url;
        }
        if let Ok(username) = self.get_env_var("ADMIN_USERNAME") {
            config.username = username;
        }
        if let Ok(password) = self.get_env_var("ADMIN_PASSWORD") {
            config.password = password;
        }
    }

    fn apply_router_overrides(&self, config: &mut crate::domains::router::RouterConfig) {
        if let Ok(url) = self.get_env_var("ROUTER_URL") {
            config.base_url = url;
        }
        if let Ok(host) = self.get_env_var("DOMAIN_HOST") {
            config.domain_host = host;
        }
    }

    fn apply_origin_overrides(&self, config: &mut crate::domains::origins::OriginsConfig) {
        if let Ok(host) = self.get_env_var("ORIGIN_HOST") {
            config.public_host = host;
        }
    }

    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::logging::LogLevel;
    use std::io::Write;

    #[test]
    fn test_from_env_overrides() {
        temp_env::with_vars(
            [
                ("SPLITPROBE_ROUTER_URL", Some("http://router.test:8081")),
                ("SPLITPROBE_DOMAIN_HOST", Some("shop.test")),
                ("SPLITPROBE_ADMIN_PASSWORD", Some("s3cret")),
                ("SPLITPROBE_HTTP_TIMEOUT", Some("9")),
                ("SPLITPROBE_LOG_LEVEL", Some("debug")),
            ],
            || {
                let config = ConfigLoader::new().from_env().unwrap();
                assert_eq!(config.router.base_url, "http://router.test:8081");
                assert_eq!(config.router.domain_host, "shop.test");
                assert_eq!(config.admin.password, "s3cret");
                assert_eq!(config.http.timeout, Duration::from_secs(9));
                assert_eq!(config.logging.level, LogLevel::Debug);
            },
        );
    }

    #[test]
    fn test_invalid_env_value_is_reported() {
        temp_env::with_var("SPLITPROBE_HTTP_TIMEOUT", Some("soon"), || {
            let err = ConfigLoader::new().from_env().unwrap_err();
            assert!(matches!(err, ConfigError::EnvError(_)));
        });
    }

    #[test]
    fn test_custom_prefix() {
        temp_env::with_var("PROBE_TEST_DOMAIN_HOST", Some("other.test"), || {
            let config = ConfigLoader::with_prefix("PROBE_TEST").from_env().unwrap();
            assert_eq!(config.router.domain_host, "other.test");
        });
    }

    #[test]
    fn test_from_file_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
topology:
  tests:
    - name: Checkout
      subpath: checkout
      variants:
        - name: A
          weight: 100
          origins:
            - name: checkout_a
              port: 9201
"#
        )
        .unwrap();

        let err = ConfigLoader::with_prefix("PROBE_FILE_TEST")
            .from_file(file.path())
            .unwrap_err();
        assert!(err.to_string().contains("subpath"));
    }

    #[test]
    fn test_from_file_reads_topology() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
router:
  domain_host: shop.test
topology:
  fallback_origins: []
  tests:
    - name: Checkout
      subpath: /checkout
      variants:
        - name: A
          weight: 70
          origins:
            - name: checkout_a
              port: 9201
        - name: B
          weight: 30
          origins:
            - name: checkout_b
"#
        )
        .unwrap();

        let config = ConfigLoader::with_prefix("PROBE_FILE_TEST")
            .from_file(file.path())
            .unwrap();
        assert_eq!(config.topology.tests.len(), 1);
        assert_eq!(config.topology.tests[0].variants[1].origins[0].port, 0);
        assert!(config.topology.fallback_origins.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new()
            .from_file("/nonexistent/splitprobe.yaml")
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileReadError(_)));
    }
}
