//! In-process stand-in for the A/B router and its provisioning API
//!
//! Two listeners share one state: the admin API stores domains, tests,
//! variants and endpoints in memory, and the routing listener answers
//! `GET <subpath>` with a 302 to one of the provisioned endpoints. Variant
//! choice is smooth weighted round-robin per test, so every block of
//! `total weight` fresh assignments matches the weights exactly. Affinity
//! is an `abra_variant_<test_id>` cookie and origins within a variant are
//! picked round-robin.

#![allow(dead_code)]

use axum::body::Body;
use axum::extract::{OriginalUri, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use splitprobe_config::{OriginSpec, ProbeConfig};
use splitprobe_http::{DomainPayload, EndpointPayload, TestPayload, VariantPayload};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const TOKEN: &str = "fake-session-token";
pub const COOKIE_PREFIX: &str = "abra_variant_";

/// How the fake router behaves
#[derive(Debug, Clone, Copy)]
pub struct RouterBehavior {
    /// Honour the affinity cookie
    pub sticky: bool,
    /// Skip origins that refuse connections
    pub health_checks: bool,
    /// Report created endpoints as alive
    pub report_alive: bool,
    /// Send every n-th request on a test subpath to the domain default pool
    pub fallback_every: Option<usize>,
}

impl Default for RouterBehavior {
    fn default() -> Self {
        Self {
            sticky: true,
            health_checks: true,
            report_alive: true,
            fallback_every: None,
        }
    }
}

#[derive(Debug, Clone)]
struct Domain {
    id: u64,
    host: String,
    active: bool,
    description: String,
}

#[derive(Debug, Clone)]
struct AbTest {
    id: u64,
    domain_id: u64,
    name: String,
    subpath: String,
    active: bool,
    description: String,
}

#[derive(Debug, Clone)]
struct Variant {
    id: u64,
    test_id: u64,
    name: String,
    weight: u32,
    active: bool,
    description: String,
}

#[derive(Debug, Clone)]
struct Endpoint {
    url: String,
    active: bool,
    alive: bool,
    description: String,
    variant_id: Option<u64>,
    domain_id: Option<u64>,
}

#[derive(Debug, Default)]
struct RouterState {
    next_id: u64,
    domains: Vec<Domain>,
    tests: Vec<AbTest>,
    variants: Vec<Variant>,
    endpoints: Vec<Endpoint>,
    /// Smooth weighted round-robin weights, per test then per variant
    current_weights: HashMap<u64, HashMap<u64, i64>>,
    /// Next endpoint index per pool
    cursors: HashMap<String, usize>,
    logins: usize,
    routed: usize,
    /// Requests that matched a test subpath
    test_requests: usize,
}

struct Decision {
    pool: String,
    candidates: Vec<String>,
    assign: Option<(u64, u64)>,
}

impl RouterState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn remove_domain(&mut self, id: u64) -> bool {
        let before = self.domains.len();
        self.domains.retain(|d| d.id != id);
        if self.domains.len() == before {
            return false;
        }
        let tests: Vec<u64> = self
            .tests
            .iter()
            .filter(|t| t.domain_id == id)
            .map(|t| t.id)
            .collect();
        for test in tests {
            self.remove_test(test);
        }
        self.endpoints.retain(|e| e.domain_id != Some(id));
        true
    }

    fn remove_test(&mut self, id: u64) -> bool {
        let before = self.tests.len();
        self.tests.retain(|t| t.id != id);
        let variants: Vec<u64> = self
            .variants
            .iter()
            .filter(|v| v.test_id == id)
            .map(|v| v.id)
            .collect();
        for variant in variants {
            self.remove_variant(variant);
        }
        self.current_weights.remove(&id);
        self.tests.len() != before
    }

    fn remove_variant(&mut self, id: u64) -> bool {
        let before = self.variants.len();
        self.variants.retain(|v| v.id != id);
        self.endpoints.retain(|e| e.variant_id != Some(id));
        self.variants.len() != before
    }

    fn decide(
        &mut self,
        host: &str,
        path: &str,
        cookies: &HashMap<String, String>,
        behavior: RouterBehavior,
    ) -> Option<Decision> {
        let domain = self
            .domains
            .iter()
            .find(|d| d.active && d.host.eq_ignore_ascii_case(host))?
            .clone();
        let test = self
            .tests
            .iter()
            .find(|t| t.active && t.domain_id == domain.id && subpath_matches(&t.subpath, path))
            .cloned();

        let Some(test) = test else {
            return self.domain_pool(domain.id);
        };
        if let Some(every) = behavior.fallback_every.filter(|n| *n > 0) {
            self.test_requests += 1;
            if self.test_requests % every == 0 {
                return self.domain_pool(domain.id);
            }
        }

        let variants: Vec<Variant> = self
            .variants
            .iter()
            .filter(|v| v.active && v.test_id == test.id)
            .cloned()
            .collect();
        let pinned = if behavior.sticky {
            cookies
                .get(&format!("{COOKIE_PREFIX}{}", test.id))
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|id| variants.iter().any(|v| v.id == *id))
        } else {
            None
        };
        let (variant_id, assign) = match pinned {
            Some(id) => (id, None),
            None => {
                let id = self.next_variant(test.id, &variants)?;
                (id, Some((test.id, id)))
            }
        };

        let candidates: Vec<String> = self
            .endpoints
            .iter()
            .filter(|e| e.active && e.variant_id == Some(variant_id))
            .map(|e| e.url.clone())
            .collect();
        Some(Decision {
            pool: format!("variant-{variant_id}"),
            candidates,
            assign,
        })
    }

    fn domain_pool(&self, domain_id: u64) -> Option<Decision> {
        let candidates: Vec<String> = self
            .endpoints
            .iter()
            .filter(|e| e.active && e.domain_id == Some(domain_id))
            .map(|e| e.url.clone())
            .collect();
        (!candidates.is_empty()).then(|| Decision {
            pool: format!("domain-{domain_id}"),
            candidates,
            assign: None,
        })
    }

    fn next_variant(&mut self, test_id: u64, variants: &[Variant]) -> Option<u64> {
        let total: i64 = variants.iter().map(|v| i64::from(v.weight)).sum();
        if total == 0 {
            return None;
        }
        let current = self.current_weights.entry(test_id).or_default();
        let mut best: Option<(u64, i64)> = None;
        for variant in variants {
            let weight = current.entry(variant.id).or_insert(0);
            *weight += i64::from(variant.weight);
            if best.map_or(true, |(_, b)| *weight > b) {
                best = Some((variant.id, *weight));
            }
        }
        let (id, _) = best?;
        if let Some(weight) = current.get_mut(&id) {
            *weight -= total;
        }
        Some(id)
    }

    fn next_cursor(&mut self, pool: &str) -> usize {
        let cursor = self.cursors.entry(pool.to_string()).or_insert(0);
        let current = *cursor;
        *cursor += 1;
        current
    }
}

fn subpath_matches(subpath: &str, path: &str) -> bool {
    let subpath = subpath.trim_end_matches('/');
    path == subpath || path.starts_with(&format!("{subpath}/"))
}

#[derive(Clone)]
struct Shared {
    state: Arc<Mutex<RouterState>>,
    behavior: RouterBehavior,
}

/// Running fake router. Dropping it stops both listeners.
pub struct FakeRouter {
    router_url: String,
    admin_url: String,
    shared: Shared,
    tasks: Vec<JoinHandle<()>>,
}

impl FakeRouter {
    pub async fn start() -> Self {
        Self::with_behavior(RouterBehavior::default()).await
    }

    pub async fn with_behavior(behavior: RouterBehavior) -> Self {
        let shared = Shared {
            state: Arc::new(Mutex::new(RouterState::default())),
            behavior,
        };

        let routing_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let admin_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let router_url = format!("http://{}", routing_listener.local_addr().unwrap());
        let admin_url = format!("http://{}", admin_listener.local_addr().unwrap());

        let routing = Router::new()
            .fallback(route_request)
            .with_state(shared.clone());
        let admin = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/{kind}", get(list).post(create))
            .route("/api/{kind}/{id}", delete(remove))
            .with_state(shared.clone());

        let tasks = vec![
            tokio::spawn(async move {
                let _ = axum::serve(routing_listener, routing).await;
            }),
            tokio::spawn(async move {
                let _ = axum::serve(admin_listener, admin).await;
            }),
        ];

        Self {
            router_url,
            admin_url,
            shared,
            tasks,
        }
    }

    pub fn router_url(&self) -> &str {
        &self.router_url
    }

    pub fn admin_url(&self) -> &str {
        &self.admin_url
    }

    /// Default configuration pointed at this router, with every origin on
    /// an ephemeral port so tests can run in parallel
    pub fn probe_config(&self) -> ProbeConfig {
        let mut config = ProbeConfig::default();
        config.router.base_url = self.router_url.clone();
        config.admin.base_url = self.admin_url.clone();
        config.origins.bind_address = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config.origins.public_host = "127.0.0.1".to_string();
        config.origins.shutdown_grace = Duration::from_millis(200);
        config.http.timeout = Duration::from_secs(2);
        config.http.connect_timeout = Duration::from_secs(1);
        config.admin.readiness.poll_interval = Duration::from_millis(20);
        config.admin.readiness.deadline = Duration::from_secs(2);

        let ephemeral = |spec: &mut OriginSpec| spec.port = 0;
        for test in &mut config.topology.tests {
            for variant in &mut test.variants {
                variant.origins.iter_mut().for_each(ephemeral);
            }
        }
        config.topology.fallback_origins.iter_mut().for_each(ephemeral);
        config
    }

    /// Plant a domain as a previous run would have left it
    pub fn seed_domain(&self, host: &str) -> u64 {
        let mut state = self.shared.state.lock();
        let id = state.allocate_id();
        state.domains.push(Domain {
            id,
            host: host.to_string(),
            active: true,
            description: "left over".to_string(),
        });
        id
    }

    pub fn domain_hosts(&self) -> Vec<String> {
        self.shared
            .state
            .lock()
            .domains
            .iter()
            .map(|d| d.host.clone())
            .collect()
    }

    /// (domains, tests, variants, endpoints)
    pub fn resource_counts(&self) -> (usize, usize, usize, usize) {
        let state = self.shared.state.lock();
        (
            state.domains.len(),
            state.tests.len(),
            state.variants.len(),
            state.endpoints.len(),
        )
    }

    pub fn endpoint_urls(&self) -> Vec<String> {
        self.shared
            .state
            .lock()
            .endpoints
            .iter()
            .map(|e| e.url.clone())
            .collect()
    }

    pub fn logins(&self) -> usize {
        self.shared.state.lock().logins
    }

    /// Requests the routing listener answered with a redirect
    pub fn routed(&self) -> usize {
        self.shared.state.lock().routed
    }
}

impl Drop for FakeRouter {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn route_request(
    State(shared): State<Shared>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(|h| h.split(':').next().unwrap_or(h).to_string())
        .unwrap_or_default();
    let path = uri.path().to_string();
    let target = uri
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| path.clone());
    let cookies = parse_cookies(&headers);

    let decision = shared
        .state
        .lock()
        .decide(&host, &path, &cookies, shared.behavior);
    let Some(decision) = decision else {
        return (StatusCode::NOT_FOUND, "no route").into_response();
    };
    let Some(url) = pick_endpoint(&shared, &decision).await else {
        return (StatusCode::BAD_GATEWAY, "no live origin").into_response();
    };
    shared.state.lock().routed += 1;

    let mut response = Response::builder()
        .status(StatusCode::FOUND)
        .header(
            header::LOCATION,
            format!("{}{}", url.trim_end_matches('/'), target),
        );
    if let Some((test_id, variant_id)) = decision.assign {
        response = response.header(
            header::SET_COOKIE,
            format!("{COOKIE_PREFIX}{test_id}={variant_id}; Path=/"),
        );
    }
    response
        .body(Body::empty())
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn pick_endpoint(shared: &Shared, decision: &Decision) -> Option<String> {
    if decision.candidates.is_empty() {
        return None;
    }
    let start = shared.state.lock().next_cursor(&decision.pool);
    let count = decision.candidates.len();

    for offset in 0..count {
        let url = &decision.candidates[(start + offset) % count];
        if !shared.behavior.health_checks || accepts_connections(url).await {
            return Some(url.clone());
        }
    }
    None
}

async fn accepts_connections(url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };
    let (Some(host), Some(port)) = (parsed.host_str(), parsed.port_or_known_default()) else {
        return false;
    };
    matches!(
        tokio::time::timeout(
            Duration::from_millis(250),
            TcpStream::connect(format!("{host}:{port}"))
        )
        .await,
        Ok(Ok(_))
    )
}

fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(|value| value == format!("Bearer {TOKEN}"))
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"}))).into_response()
}

fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"error": message.into()}))).into_response()
}

async fn login(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    let login = body.get("login").and_then(Value::as_str);
    let password = body.get("password").and_then(Value::as_str);
    if login == Some("admin") && password == Some("admin") {
        shared.state.lock().logins += 1;
        Json(json!({"token": TOKEN})).into_response()
    } else {
        unauthorized()
    }
}

async fn list(
    State(shared): State<Shared>,
    Path(kind): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let state = shared.state.lock();
    let items: Vec<Value> = match kind.as_str() {
        "domains" => state.domains.iter().map(domain_json).collect(),
        "tests" => state.tests.iter().map(test_json).collect(),
        "variants" => state.variants.iter().map(variant_json).collect(),
        "endpoints" => state.endpoints.iter().map(endpoint_json).collect(),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Json(Value::Array(items)).into_response()
}

async fn create(
    State(shared): State<Shared>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = shared.state.lock();

    let created = match kind.as_str() {
        "domains" => {
            let Ok(payload) = serde_json::from_value::<DomainPayload>(body) else {
                return bad_request("invalid domain");
            };
            if state.domains.iter().any(|d| d.host == payload.host) {
                return (
                    StatusCode::CONFLICT,
                    Json(json!({"error": format!("domain {} already exists", payload.host)})),
                )
                    .into_response();
            }
            let domain = Domain {
                id: state.allocate_id(),
                host: payload.host,
                active: payload.active,
                description: payload.description,
            };
            let created = domain_json(&domain);
            state.domains.push(domain);
            created
        }
        "tests" => {
            let Ok(payload) = serde_json::from_value::<TestPayload>(body) else {
                return bad_request("invalid test");
            };
            let Some(domain_id) = parse_parent(&payload.domain.domain_id, |id| {
                state.domains.iter().any(|d| d.id == id)
            }) else {
                return bad_request("unknown domain");
            };
            let test = AbTest {
                id: state.allocate_id(),
                domain_id,
                name: payload.name,
                subpath: payload.subpath,
                active: payload.active,
                description: payload.description,
            };
            let created = test_json(&test);
            state.tests.push(test);
            created
        }
        "variants" => {
            let Ok(payload) = serde_json::from_value::<VariantPayload>(body) else {
                return bad_request("invalid variant");
            };
            let Some(test_id) = parse_parent(&payload.test.test_id, |id| {
                state.tests.iter().any(|t| t.id == id)
            }) else {
                return bad_request("unknown test");
            };
            let variant = Variant {
                id: state.allocate_id(),
                test_id,
                name: payload.name,
                weight: payload.weight,
                active: payload.active,
                description: payload.description,
            };
            let created = variant_json(&variant);
            state.variants.push(variant);
            created
        }
        "endpoints" => {
            let Ok(payload) = serde_json::from_value::<EndpointPayload>(body) else {
                return bad_request("invalid endpoint");
            };
            let variant_id = match &payload.variant {
                Some(variant) => match parse_parent(&variant.variant_id, |id| {
                    state.variants.iter().any(|v| v.id == id)
                }) {
                    Some(id) => Some(id),
                    None => return bad_request("unknown variant"),
                },
                None => None,
            };
            let domain_id = match &payload.domain {
                Some(domain) => match parse_parent(&domain.domain_id, |id| {
                    state.domains.iter().any(|d| d.id == id)
                }) {
                    Some(id) => Some(id),
                    None => return bad_request("unknown domain"),
                },
                None => None,
            };
            if variant_id.is_none() && domain_id.is_none() {
                return bad_request("endpoint needs a variant or a domain");
            }
            let endpoint = Endpoint {
                url: payload.url,
                active: payload.active,
                alive: payload.alive && shared.behavior.report_alive,
                description: payload.description,
                variant_id,
                domain_id,
            };
            let created = endpoint_json(&endpoint);
            state.endpoints.push(endpoint);
            created
        }
        _ => return StatusCode::NOT_FOUND.into_response(),
    };

    (StatusCode::CREATED, Json(created)).into_response()
}

async fn remove(
    State(shared): State<Shared>,
    Path((kind, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = shared.state.lock();
    let removed = match kind.as_str() {
        "domains" => id.parse::<u64>().map(|id| state.remove_domain(id)).unwrap_or(false),
        "tests" => id.parse::<u64>().map(|id| state.remove_test(id)).unwrap_or(false),
        "variants" => id.parse::<u64>().map(|id| state.remove_variant(id)).unwrap_or(false),
        "endpoints" => {
            let before = state.endpoints.len();
            state.endpoints.retain(|e| e.url != id);
            state.endpoints.len() != before
        }
        _ => false,
    };
    if removed {
        StatusCode::NO_CONTENT.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

fn parse_parent(id: &str, exists: impl Fn(u64) -> bool) -> Option<u64> {
    id.parse().ok().filter(|id| exists(*id))
}

fn domain_json(domain: &Domain) -> Value {
    json!({
        "domain_id": domain.id,
        "host": domain.host,
        "active": domain.active,
        "description": domain.description,
    })
}

fn test_json(test: &AbTest) -> Value {
    json!({
        "test_id": test.id,
        "name": test.name,
        "subpath": test.subpath,
        "active": test.active,
        "description": test.description,
        "domainModel": {"domain_id": test.domain_id},
    })
}

fn variant_json(variant: &Variant) -> Value {
    json!({
        "variant_id": variant.id,
        "name": variant.name,
        "weight": variant.weight,
        "active": variant.active,
        "description": variant.description,
        "testModel": {"test_id": variant.test_id},
    })
}

fn endpoint_json(endpoint: &Endpoint) -> Value {
    json!({
        "url": endpoint.url,
        "active": endpoint.active,
        "alive": endpoint.alive,
        "description": endpoint.description,
        "variantModel": endpoint.variant_id.map(|id| json!({"variant_id": id})),
        "domainModel": endpoint.domain_id.map(|id| json!({"domain_id": id})),
    })
}
