//! Shared fixtures for the HTTP integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request, StatusCode},
    Router,
};
use fake::faker::address::en::CityName;
use fake::faker::internet::en::DomainSuffix;
use fake::faker::lorem::en::{Sentence, Word};
use fake::Fake;
use serde_json::Value;
use parking_lot::Mutex;
use std::sync::Arc;
use tower::ServiceExt;

use panel_core::api::{build_router, AppState};
use panel_core::config::Config;
use panel_core::db::{InMemoryRepository, Page, ResourceRepository};
use panel_core::error::{PanelError, Result};
use panel_core::middleware::ApiKeyStore;
use panel_core::models::{Location, Node, Server};
use panel_core::pagination::ListRequest;
use panel_core::rbac::{AccessScope, Capability};

pub const PUBLIC_URL: &str = "https://panel.example.com";
pub const IDENTIFIER: &str = "ptlaIntegration1";
pub const TOKEN: &str = "0123456789abcdef0123456789abcdef";

// ═══════════════════════════════════════════════════════════════════════════════
// Factories
// ═══════════════════════════════════════════════════════════════════════════════

pub fn fake_location() -> Location {
    let short = format!("{}.{}", Word().fake::<String>(), Word().fake::<String>());
    Location::new(0, short, Some(CityName().fake()))
}

pub fn fake_node(location_id: i64) -> Node {
    let name: String = Word().fake();
    let fqdn = format!("{}.{}", name, DomainSuffix().fake::<String>());
    let mut node = Node::new(0, location_id, name, fqdn);
    node.description = Some(Sentence(3..6).fake());
    node
}

pub fn fake_server(node_id: i64) -> Server {
    let mut server = Server::new(0, node_id, Word().fake::<String>());
    server.description = Sentence(3..8).fake();
    server
}

pub fn scope(capabilities: &[Capability]) -> AccessScope {
    capabilities.iter().copied().collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Router Harness
// ═══════════════════════════════════════════════════════════════════════════════

/// Router with one registered key carrying `scope`.
pub fn app(repository: Arc<dyn ResourceRepository>, scope: AccessScope) -> Router {
    let keys = ApiKeyStore::new();
    keys.register(IDENTIFIER, TOKEN, scope, "integration tests");

    let mut config = Config::default();
    config.server.public_url = PUBLIC_URL.to_string();

    build_router(AppState::new(repository, Arc::new(keys), &config))
}

pub fn bearer() -> String {
    format!("Bearer {}{}", IDENTIFIER, TOKEN)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

/// Authenticated GET.
pub async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::get(uri)
        .header(AUTHORIZATION, bearer())
        .body(Body::empty())
        .unwrap();
    send(router, request).await
}

/// GET without credentials.
pub async fn get_anonymous(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

/// Assert the standard single-error body.
pub fn assert_error(body: &Value, code: &str, status: &str, detail: &str) {
    let errors = body["errors"].as_array().expect("errors array");
    assert_eq!(errors.len(), 1, "{body}");
    assert_eq!(errors[0]["code"], code, "{body}");
    assert_eq!(errors[0]["status"], status, "{body}");
    assert_eq!(errors[0]["detail"], detail, "{body}");
}

// ═══════════════════════════════════════════════════════════════════════════════
// Counting Repository
// ═══════════════════════════════════════════════════════════════════════════════

/// Wraps a repository and records every call made through it.
pub struct CountingRepository {
    inner: Arc<InMemoryRepository>,
    calls: Mutex<Vec<&'static str>>,
}

const RELATIONSHIP_METHODS: &[&str] = &[
    "nodes_for_location",
    "servers_for_location",
    "servers_for_node",
    "location_for_server",
];

impl CountingRepository {
    pub fn new(inner: Arc<InMemoryRepository>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every repository method called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    /// Calls to the relationship-only lookups.
    pub fn relationship_calls(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| RELATIONSHIP_METHODS.contains(call))
            .count()
    }

    pub fn reset(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, method: &'static str) {
        self.calls.lock().push(method);
    }
}

#[async_trait]
impl ResourceRepository for CountingRepository {
    async fn list_locations(&self, request: &ListRequest) -> Result<Page<Location>> {
        self.record("list_locations");
        self.inner.list_locations(request).await
    }

    async fn find_location(&self, id: i64) -> Result<Option<Location>> {
        self.record("find_location");
        self.inner.find_location(id).await
    }

    async fn nodes_for_location(&self, location_id: i64) -> Result<Vec<Node>> {
        self.record("nodes_for_location");
        self.inner.nodes_for_location(location_id).await
    }

    async fn servers_for_location(&self, location_id: i64) -> Result<Vec<Server>> {
        self.record("servers_for_location");
        self.inner.servers_for_location(location_id).await
    }

    async fn list_nodes(&self, request: &ListRequest) -> Result<Page<Node>> {
        self.record("list_nodes");
        self.inner.list_nodes(request).await
    }

    async fn find_node(&self, id: i64) -> Result<Option<Node>> {
        self.record("find_node");
        self.inner.find_node(id).await
    }

    async fn servers_for_node(&self, node_id: i64) -> Result<Vec<Server>> {
        self.record("servers_for_node");
        self.inner.servers_for_node(node_id).await
    }

    async fn list_servers(&self, request: &ListRequest) -> Result<Page<Server>> {
        self.record("list_servers");
        self.inner.list_servers(request).await
    }

    async fn find_server(&self, id: i64) -> Result<Option<Server>> {
        self.record("find_server");
        self.inner.find_server(id).await
    }

    async fn location_for_server(&self, server_id: i64) -> Result<Option<Location>> {
        self.record("location_for_server");
        self.inner.location_for_server(server_id).await
    }
}

/// A repository whose storage is unreachable.
pub struct UnreachableRepository;

#[async_trait]
impl ResourceRepository for UnreachableRepository {
    async fn list_locations(&self, _request: &ListRequest) -> Result<Page<Location>> {
        Err(PanelError::from(sqlx::Error::PoolTimedOut))
    }

    async fn find_location(&self, _id: i64) -> Result<Option<Location>> {
        Err(PanelError::from(sqlx::Error::PoolTimedOut))
    }

    async fn nodes_for_location(&self, _location_id: i64) -> Result<Vec<Node>> {
        Err(PanelError::from(sqlx::Error::PoolTimedOut))
    }

    async fn servers_for_location(&self, _location_id: i64) -> Result<Vec<Server>> {
        Err(PanelError::from(sqlx::Error::PoolTimedOut))
    }

    async fn list_nodes(&self, _request: &ListRequest) -> Result<Page<Node>> {
        Err(PanelError::from(sqlx::Error::PoolTimedOut))
    }

    async fn find_node(&self, _id: i64) -> Result<Option<Node>> {
        Err(PanelError::from(sqlx::Error::PoolTimedOut))
    }

    async fn servers_for_node(&self, _node_id: i64) -> Result<Vec<Server>> {
        Err(PanelError::from(sqlx::Error::PoolTimedOut))
    }

    async fn list_servers(&self, _request: &ListRequest) -> Result<Page<Server>> {
        Err(PanelError::from(sqlx::Error::PoolTimedOut))
    }

    async fn find_server(&self, _id: i64) -> Result<Option<Server>> {
        Err(PanelError::from(sqlx::Error::PoolTimedOut))
    }

    async fn location_for_server(&self, _server_id: i64) -> Result<Option<Location>> {
        Err(PanelError::from(sqlx::Error::PoolTimedOut))
    }

    async fn ping(&self) -> Result<()> {
        Err(PanelError::from(sqlx::Error::PoolTimedOut))
    }
}
