//! Client for the router's administrative provisioning API
//!
//! Authentication yields a [`ProvisioningSession`] that owns the bearer
//! token for the rest of the run. Resources are created parent-first
//! (domain, test, variant, endpoint) and referenced by the id the API
//! hands back.

use crate::client::HttpManager;
use crate::errors::{body_snippet, ProvisionError};
use crate::types::HttpMethod;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};
use url::Url;

/// Resource collections exposed by the provisioning API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Domain,
    Test,
    Variant,
    Endpoint,
}

impl ResourceKind {
    /// Collection path segment under `/api`
    pub fn segment(&self) -> &'static str {
        match self {
            ResourceKind::Domain => "domains",
            ResourceKind::Test => "tests",
            ResourceKind::Variant => "variants",
            ResourceKind::Endpoint => "endpoints",
        }
    }

    /// Field carrying the resource id in API responses
    pub fn id_field(&self) -> &'static str {
        match self {
            ResourceKind::Domain => "domain_id",
            ResourceKind::Test => "test_id",
            ResourceKind::Variant => "variant_id",
            ResourceKind::Endpoint => "url",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// Login credentials
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    login: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRef {
    pub domain_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRef {
    pub test_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRef {
    pub variant_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainPayload {
    pub host: String,
    pub active: bool,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPayload {
    pub name: String,
    pub subpath: String,
    pub active: bool,
    pub description: String,
    #[serde(rename = "domainModel")]
    pub domain: DomainRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantPayload {
    pub name: String,
    pub weight: u32,
    pub active: bool,
    pub description: String,
    #[serde(rename = "testModel")]
    pub test: TestRef,
}

/// An endpoint belongs either to a variant or, as a fallback, to a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPayload {
    pub url: String,
    pub active: bool,
    pub alive: bool,
    pub description: String,
    #[serde(rename = "variantModel", skip_serializing_if = "Option::is_none")]
    pub variant: Option<VariantRef>,
    #[serde(rename = "domainModel", skip_serializing_if = "Option::is_none")]
    pub domain: Option<DomainRef>,
}

impl EndpointPayload {
    pub fn for_variant(
        url: impl Into<String>,
        variant_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            active: true,
            alive: true,
            description: description.into(),
            variant: Some(VariantRef {
                variant_id: variant_id.into(),
            }),
            domain: None,
        }
    }

    pub fn for_domain(
        url: impl Into<String>,
        domain_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            active: true,
            alive: true,
            description: description.into(),
            variant: None,
            domain: Some(DomainRef {
                domain_id: domain_id.into(),
            }),
        }
    }
}

/// Unauthenticated entry point
#[derive(Debug, Clone)]
pub struct ProvisioningClient {
    base_url: Url,
    client: Client,
}

impl ProvisioningClient {
    pub fn new(base_url: &str, http: &HttpManager) -> Result<Self, ProvisionError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            ProvisionError::Http(crate::HttpError::InvalidUrl(format!("{base_url}: {e}")))
        })?;
        Ok(Self {
            base_url,
            client: http.api_client()?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `POST /api/auth/login`. The returned session carries the token.
    pub async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<ProvisioningSession, ProvisionError> {
        let url = api_url(&self.base_url, &["auth", "login"]);
        debug!("Authenticating as '{}' at {}", credentials.username, url);

        let response = self
            .client
            .post(url.clone())
            .json(&LoginRequest {
                login: &credentials.username,
                password: &credentials.password,
            })
            .send()
            .await
            .map_err(|e| ProvisionError::from_transport(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_snippet(response).await;
            return Err(ProvisionError::Auth(format!(
                "login returned status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| ProvisionError::Auth(format!("unreadable login response: {e}")))?;
        let token = login
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProvisionError::Auth("login succeeded but no token returned".into()))?;

        info!("Authenticated with provisioning API as '{}'", credentials.username);
        Ok(ProvisioningSession {
            base_url: self.base_url.clone(),
            client: self.client.clone(),
            token,
        })
    }
}

/// Authenticated session; every call carries `Authorization: Bearer <token>`
#[derive(Clone)]
pub struct ProvisioningSession {
    base_url: Url,
    client: Client,
    token: String,
}

impl fmt::Debug for ProvisioningSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisioningSession")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

impl ProvisioningSession {
    async fn send(
        &self,
        method: HttpMethod,
        url: Url,
        body: Option<&JsonValue>,
    ) -> Result<Response, ProvisionError> {
        debug!("{} {}", method, url);
        let mut request = self
            .client
            .request(method.into(), url.clone())
            .bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(body);
        }
        request
            .send()
            .await
            .map_err(|e| ProvisionError::from_transport(url.as_str(), e))
    }

    /// `GET /api/{kind}`
    pub async fn list(&self, kind: ResourceKind) -> Result<Vec<JsonValue>, ProvisionError> {
        let url = api_url(&self.base_url, &[kind.segment()]);
        let response = self.send(HttpMethod::Get, url, None).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProvisionError::List {
                kind: kind.segment(),
                status: status.as_u16(),
                body: read_snippet(response).await,
            });
        }

        let value: JsonValue = response.json().await.map_err(|e| ProvisionError::Malformed {
            kind: kind.segment(),
            detail: e.to_string(),
        })?;
        match value {
            JsonValue::Array(items) => Ok(items),
            other => Err(ProvisionError::Malformed {
                kind: kind.segment(),
                detail: format!("expected a JSON array, got {}", json_type(&other)),
            }),
        }
    }

    /// `POST /api/{kind}`, returning the id of the created resource
    pub async fn create<P: Serialize>(
        &self,
        kind: ResourceKind,
        payload: &P,
    ) -> Result<String, ProvisionError> {
        let body = serde_json::to_value(payload).map_err(crate::HttpError::from)?;
        let url = api_url(&self.base_url, &[kind.segment()]);
        let response = self.send(HttpMethod::Post, url, Some(&body)).await?;

        let status = response.status();
        if !status.is_success() {
            let snippet = read_snippet(response).await;
            warn!(
                "Creating {} failed with status {}: {}",
                kind,
                status.as_u16(),
                snippet
            );
            return Err(ProvisionError::Create {
                kind: kind.segment(),
                status: status.as_u16(),
                body: snippet,
            });
        }

        let created: JsonValue = response.json().await.map_err(|e| ProvisionError::Malformed {
            kind: kind.segment(),
            detail: e.to_string(),
        })?;
        let id = extract_id(&created, kind.id_field()).ok_or_else(|| ProvisionError::Malformed {
            kind: kind.segment(),
            detail: format!("response has no '{}' field", kind.id_field()),
        })?;

        debug!("Created {} with id {}", kind, id);
        Ok(id)
    }

    /// `DELETE /api/{kind}/{id}`. A 404 counts as already deleted.
    pub async fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), ProvisionError> {
        let url = api_url(&self.base_url, &[kind.segment(), id]);
        let response = self.send(HttpMethod::Delete, url, None).await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            debug!("Deleted {} '{}' (status {})", kind, id, status.as_u16());
            return Ok(());
        }
        Err(ProvisionError::Delete {
            kind: kind.segment(),
            id: id.to_string(),
            status: status.as_u16(),
            body: read_snippet(response).await,
        })
    }

    /// Delete every domain whose host is `domain_host`, returning how many
    /// were removed. Running it on a clean state deletes nothing.
    pub async fn ensure_clean(&self, domain_host: &str) -> Result<usize, ProvisionError> {
        let domains = self.list(ResourceKind::Domain).await?;
        let mut removed = 0;

        for domain in domains
            .iter()
            .filter(|d| d.get("host").and_then(JsonValue::as_str) == Some(domain_host))
        {
            let id = extract_id(domain, ResourceKind::Domain.id_field()).ok_or_else(|| {
                ProvisionError::Malformed {
                    kind: ResourceKind::Domain.segment(),
                    detail: format!("domain '{domain_host}' has no domain_id"),
                }
            })?;
            self.delete(ResourceKind::Domain, &id).await?;
            info!("Removed existing domain {} (id {})", domain_host, id);
            removed += 1;
        }

        if removed == 0 {
            debug!("No existing domain for {}", domain_host);
        }
        Ok(removed)
    }

    /// Liveness of every endpoint known to the API, keyed by URL
    pub async fn endpoint_liveness(&self) -> Result<BTreeMap<String, bool>, ProvisionError> {
        let endpoints = self.list(ResourceKind::Endpoint).await?;
        Ok(endpoints
            .iter()
            .filter_map(|endpoint| {
                let url = endpoint.get("url")?.as_str()?.to_string();
                let alive = endpoint
                    .get("alive")
                    .and_then(JsonValue::as_bool)
                    .unwrap_or(false);
                Some((url, alive))
            })
            .collect())
    }
}

fn api_url(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().push("api").extend(segments);
    }
    url
}

/// Ids come back as numbers or strings depending on the backend
fn extract_id(value: &JsonValue, field: &str) -> Option<String> {
    match value.get(field)? {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_type(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

async fn read_snippet(response: Response) -> String {
    match response.text().await {
        Ok(body) => body_snippet(&body),
        Err(e) => format!("<unreadable body: {e}>"),
    }
}
