//! HTTP client factory

use crate::config::HttpConfig;
use crate::errors::HttpError;
use crate::types::RedirectMode;
use reqwest::header::{HeaderMap, HeaderValue, HOST};
use reqwest::{redirect::Policy, Client};
use tracing::debug;

/// Options for a single client instance
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub redirects: RedirectMode,
    /// Give the client its own cookie jar
    pub cookies: bool,
    /// `Host` header sent with every request
    pub host: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            redirects: RedirectMode::Manual,
            cookies: false,
            host: None,
        }
    }
}

/// Builds `reqwest` clients sharing one configuration.
///
/// Each simulated user needs a client of its own, since the cookie jar
/// lives inside the client.
#[derive(Debug, Clone, Default)]
pub struct HttpManager {
    config: HttpConfig,
}

impl HttpManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: HttpConfig) -> Self {
        debug!(
            "Creating HttpManager with timeout: {}ms",
            config.timeout.as_millis()
        );
        Self { config }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Client for the provisioning API: follows redirects, no cookies
    pub fn api_client(&self) -> Result<Client, HttpError> {
        self.build(&ClientOptions {
            redirects: RedirectMode::Follow,
            ..ClientOptions::default()
        })
    }

    pub fn build(&self, options: &ClientOptions) -> Result<Client, HttpError> {
        let policy = match options.redirects {
            RedirectMode::Manual => Policy::none(),
            RedirectMode::Follow => Policy::limited(self.config.max_redirects as usize),
        };

        let mut builder = Client::builder()
            .timeout(self.config.timeout)
            .connect_timeout(self.config.connect_timeout)
            .user_agent(&self.config.user_agent)
            .redirect(policy)
            .cookie_store(options.cookies);

        if let Some(host) = &options.host {
            let value = HeaderValue::from_str(host).map_err(|_| HttpError::InvalidHeader {
                name: HOST.to_string(),
                value: host.clone(),
            })?;
            let mut headers = HeaderMap::new();
            headers.insert(HOST, value);
            builder = builder.default_headers(headers);
        }

        debug!(
            "Building HTTP client (redirects: {:?}, cookies: {})",
            options.redirects, options.cookies
        );
        Ok(builder.build()?)
    }
}
