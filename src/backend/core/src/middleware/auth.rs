//! Application API key authentication.
//!
//! Keys are sent as `Authorization: Bearer <identifier><token>`, where the
//! identifier is 16 characters and the token 32. Only the SHA-256 of the
//! token is stored.
//!
//! # Example
//!
//! ```rust,ignore
//! use panel_core::middleware::auth::{ApiKeyStore, AuthLayer};
//!
//! let store = Arc::new(ApiKeyStore::from_config(&config.api_keys));
//! let app = Router::new()
//!     .nest("/api/application", application_routes())
//!     .layer(AuthLayer::new(store));
//! ```

use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::BoxFuture;
use metrics::counter;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::{
    sync::Arc,
    task::{Context, Poll},
};
use thiserror::Error;
use tower::{Layer, Service};
use tracing::debug;
use uuid::Uuid;

use crate::config::ApiKeyConfig;
use crate::error::PanelError;
use crate::rbac::AccessScope;
use crate::telemetry::{mask_api_key, ApiMetrics};

/// Length of the public key identifier.
pub const IDENTIFIER_LENGTH: usize = 16;

/// Length of the secret token.
pub const TOKEN_LENGTH: usize = 32;

/// Length of a full bearer key.
pub const KEY_LENGTH: usize = IDENTIFIER_LENGTH + TOKEN_LENGTH;

const REQUEST_ID_HEADER: &str = "X-Request-ID";

// ═══════════════════════════════════════════════════════════════════════════════
// Error Types
// ═══════════════════════════════════════════════════════════════════════════════

/// Authentication errors.
///
/// All of them render as the same 401 body; the variant only reaches logs
/// and the `panel_auth_failures_total` counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing authentication credentials")]
    MissingCredentials,

    #[error("Malformed API key")]
    MalformedKey,

    #[error("Unknown API key identifier")]
    UnknownKey,

    #[error("Invalid API key token")]
    InvalidToken,

    #[error("API key disabled")]
    KeyDisabled,

    #[error("Authentication context missing from request")]
    MissingContext,
}

impl AuthError {
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "missing_credentials",
            Self::MalformedKey => "malformed_key",
            Self::UnknownKey => "unknown_key",
            Self::InvalidToken => "invalid_token",
            Self::KeyDisabled => "key_disabled",
            Self::MissingContext => "missing_context",
        }
    }
}

impl From<AuthError> for PanelError {
    fn from(error: AuthError) -> Self {
        PanelError::unauthenticated(error.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiMetrics::record_auth_failure(self.reason());
        PanelError::from(self).into_response()
    }
}

/// Hex-encoded SHA-256 of a token.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Prefix of generated application key identifiers.
pub const IDENTIFIER_PREFIX: &str = "ptla";

const KEY_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(KEY_ALPHABET[rng.random_range(0..KEY_ALPHABET.len())]))
        .collect()
}

/// Generate a fresh `(identifier, token)` pair.
pub fn generate_key() -> (String, String) {
    let identifier = format!(
        "{}{}",
        IDENTIFIER_PREFIX,
        random_alphanumeric(IDENTIFIER_LENGTH - IDENTIFIER_PREFIX.len())
    );
    (identifier, random_alphanumeric(TOKEN_LENGTH))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ═══════════════════════════════════════════════════════════════════════════════
// Key Store
// ═══════════════════════════════════════════════════════════════════════════════

/// A stored application API key.
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub identifier: String,
    pub token_hash: String,
    pub memo: String,
    pub active: bool,
    pub scope: AccessScope,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Application API keys keyed by identifier.
#[derive(Debug, Default)]
pub struct ApiKeyStore {
    keys: DashMap<String, ApiKey>,
}

impl ApiKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the store from configured keys.
    pub fn from_config(keys: &[ApiKeyConfig]) -> Self {
        let store = Self::new();
        for key in keys {
            store.insert(ApiKey {
                identifier: key.identifier.clone(),
                token_hash: key.token_hash.to_ascii_lowercase(),
                memo: key.memo.clone(),
                active: key.active,
                scope: key.permissions,
                last_used_at: None,
            });
        }
        store
    }

    pub fn insert(&self, key: ApiKey) {
        self.keys.insert(key.identifier.clone(), key);
    }

    /// Register a key from its plaintext token.
    pub fn register(
        &self,
        identifier: impl Into<String>,
        token: &str,
        scope: AccessScope,
        memo: impl Into<String>,
    ) -> ApiKey {
        let key = ApiKey {
            identifier: identifier.into(),
            token_hash: hash_token(token),
            memo: memo.into(),
            active: true,
            scope,
            last_used_at: None,
        };
        self.insert(key.clone());
        key
    }

    pub fn get(&self, identifier: &str) -> Option<ApiKey> {
        self.keys.get(identifier).map(|entry| entry.value().clone())
    }

    /// Disable a key. Returns `false` for an unknown identifier.
    pub fn revoke(&self, identifier: &str) -> bool {
        match self.keys.get_mut(identifier) {
            Some(mut entry) => {
                entry.active = false;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Verify a full bearer key and stamp its last use.
    pub fn verify(&self, raw: &str) -> Result<ApiKey, AuthError> {
        if raw.len() != KEY_LENGTH || !raw.is_ascii() {
            return Err(AuthError::MalformedKey);
        }

        let (identifier, token) = raw.split_at(IDENTIFIER_LENGTH);
        let mut entry = self.keys.get_mut(identifier).ok_or(AuthError::UnknownKey)?;

        if !constant_time_eq(hash_token(token).as_bytes(), entry.token_hash.as_bytes()) {
            return Err(AuthError::InvalidToken);
        }
        if !entry.active {
            return Err(AuthError::KeyDisabled);
        }

        entry.last_used_at = Some(Utc::now());
        Ok(entry.value().clone())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Authentication Context
// ═══════════════════════════════════════════════════════════════════════════════

/// Authentication context attached to requests.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Key identifier
    pub identifier: String,

    pub memo: String,

    /// Read capabilities of the key
    pub scope: AccessScope,

    /// Request ID for correlation
    pub request_id: String,
}

impl AuthContext {
    pub fn from_api_key(key: &ApiKey, request_id: String) -> Self {
        Self {
            identifier: key.identifier.clone(),
            memo: key.memo.clone(),
            scope: key.scope,
            request_id,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Authenticator
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolves request credentials against the key store.
pub struct Authenticator {
    store: Arc<ApiKeyStore>,
    public_paths: Vec<String>,
}

impl Authenticator {
    pub fn new(store: Arc<ApiKeyStore>) -> Self {
        Self {
            store,
            public_paths: vec!["/health".to_string(), "/metrics".to_string()],
        }
    }

    pub fn with_public_path(mut self, path: impl Into<String>) -> Self {
        self.public_paths.push(path.into());
        self
    }

    /// Check if a path is public (doesn't require auth).
    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| match p.strip_suffix('*') {
            Some(prefix) => path.starts_with(prefix),
            None => path == p,
        })
    }

    /// Authenticate a request.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let raw = extract_api_key(headers).ok_or(AuthError::MissingCredentials)?;

        match self.store.verify(raw) {
            Ok(key) => {
                counter!("panel_auth_success_total").increment(1);
                debug!(key = %mask_api_key(raw, IDENTIFIER_LENGTH), request_id = %request_id, "Authenticated");
                Ok(AuthContext::from_api_key(&key, request_id))
            }
            Err(error) => {
                // The rejection is logged at warn once it renders as a response.
                debug!(
                    key = %mask_api_key(raw, IDENTIFIER_LENGTH),
                    request_id = %request_id,
                    reason = error.reason(),
                    "API key rejected"
                );
                Err(error)
            }
        }
    }
}

/// Bearer credential from the `Authorization` header.
pub fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer ").or_else(|| s.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Layer and Service
// ═══════════════════════════════════════════════════════════════════════════════

/// Authentication layer for Tower.
#[derive(Clone)]
pub struct AuthLayer {
    authenticator: Arc<Authenticator>,
}

impl AuthLayer {
    pub fn new(store: Arc<ApiKeyStore>) -> Self {
        Self::from_authenticator(Authenticator::new(store))
    }

    pub fn from_authenticator(authenticator: Authenticator) -> Self {
        Self {
            authenticator: Arc::new(authenticator),
        }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            authenticator: self.authenticator.clone(),
        }
    }
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    authenticator: Arc<Authenticator>,
}

impl<S> Service<Request<Body>> for AuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let authenticator = self.authenticator.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if authenticator.is_public_path(request.uri().path()) {
                return inner.call(request).await;
            }

            match authenticator.authenticate(request.headers()) {
                Ok(context) => {
                    request.extensions_mut().insert(context);
                    inner.call(request).await
                }
                Err(error) => Ok(error.into_response()),
            }
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Axum Extractor
// ═══════════════════════════════════════════════════════════════════════════════

/// Extractor for authentication context in handlers.
#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingContext)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::Capability;
    use axum::http::{HeaderValue, StatusCode};
    use std::convert::Infallible;
    use tower::ServiceExt;

    const IDENTIFIER: &str = "ptlaAbCdEfGhIjKl";
    const TOKEN: &str = "0123456789abcdef0123456789abcdef";

    fn store() -> Arc<ApiKeyStore> {
        let store = ApiKeyStore::new();
        store.register(IDENTIFIER, TOKEN, AccessScope::full(), "test key");
        Arc::new(store)
    }

    fn bearer(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_hash_token() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_generate_key_shape() {
        let (identifier, token) = generate_key();
        assert_eq!(identifier.len(), IDENTIFIER_LENGTH);
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(identifier.starts_with(IDENTIFIER_PREFIX));
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(identifier.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(generate_key().1, token);

        let store = ApiKeyStore::new();
        store.register(identifier.clone(), &token, AccessScope::none(), "");
        assert!(store.verify(&format!("{}{}", identifier, token)).is_ok());
    }

    #[test]
    fn test_verify_valid_key_stamps_last_use() {
        let store = store();
        let key = store.verify(&format!("{}{}", IDENTIFIER, TOKEN)).unwrap();

        assert_eq!(key.identifier, IDENTIFIER);
        assert!(key.scope.allows(Capability::Locations));
        assert!(store.get(IDENTIFIER).unwrap().last_used_at.is_some());
    }

    #[test]
    fn test_verify_rejections() {
        let store = store();

        assert_eq!(store.verify("short").unwrap_err(), AuthError::MalformedKey);
        assert_eq!(
            store.verify(&format!("{}{}", "zzzzzzzzzzzzzzzz", TOKEN)).unwrap_err(),
            AuthError::UnknownKey
        );
        assert_eq!(
            store
                .verify(&format!("{}{}", IDENTIFIER, "ffffffffffffffffffffffffffffffff"))
                .unwrap_err(),
            AuthError::InvalidToken
        );

        assert!(store.revoke(IDENTIFIER));
        assert_eq!(
            store.verify(&format!("{}{}", IDENTIFIER, TOKEN)).unwrap_err(),
            AuthError::KeyDisabled
        );
        assert!(!store.revoke("missing"));
    }

    #[test]
    fn test_extract_api_key() {
        assert_eq!(extract_api_key(&bearer("abc")), Some("abc"));
        assert_eq!(extract_api_key(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_api_key(&headers), None);
    }

    #[test]
    fn test_authenticator_public_paths() {
        let auth = Authenticator::new(store()).with_public_path("/docs/*");

        assert!(auth.is_public_path("/health"));
        assert!(auth.is_public_path("/docs/index.html"));
        assert!(!auth.is_public_path("/api/application/locations"));
    }

    #[test]
    fn test_authenticate_carries_request_id_and_scope() {
        let auth = Authenticator::new(store());
        let mut headers = bearer(&format!("{}{}", IDENTIFIER, TOKEN));
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-42"));

        let context = auth.authenticate(&headers).unwrap();
        assert_eq!(context.request_id, "req-42");
        assert_eq!(context.memo, "test key");
        assert_eq!(context.scope, AccessScope::full());

        assert_eq!(
            auth.authenticate(&HeaderMap::new()).unwrap_err(),
            AuthError::MissingCredentials
        );
    }

    #[test]
    fn test_from_config_lowercases_hash() {
        let config = ApiKeyConfig {
            identifier: IDENTIFIER.to_string(),
            token_hash: hash_token(TOKEN).to_ascii_uppercase(),
            memo: String::new(),
            active: true,
            permissions: AccessScope::none(),
        };

        let store = ApiKeyStore::from_config(&[config]);
        assert_eq!(store.len(), 1);
        assert!(store.verify(&format!("{}{}", IDENTIFIER, TOKEN)).is_ok());
    }

    #[derive(Clone, Default)]
    struct WarnCounter(Arc<std::sync::atomic::AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_rejected_key_warns_once() {
        use tracing_subscriber::layer::SubscriberExt;

        let counter = WarnCounter::default();
        let subscriber = tracing_subscriber::registry().with(counter.clone());
        let auth = Authenticator::new(store());

        tracing::subscriber::with_default(subscriber, || {
            let error = auth
                .authenticate(&bearer(&format!("{}{}", IDENTIFIER, "f".repeat(TOKEN_LENGTH))))
                .unwrap_err();
            assert_eq!(error, AuthError::InvalidToken);
            assert_eq!(error.into_response().status(), StatusCode::UNAUTHORIZED);
        });

        assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_layer_rejects_and_admits() {
        let service = AuthLayer::new(store()).layer(tower::service_fn(|request: Request<Body>| async move {
            let status = if request.extensions().get::<AuthContext>().is_some() {
                StatusCode::OK
            } else {
                StatusCode::NO_CONTENT
            };
            Ok::<_, Infallible>(status.into_response())
        }));

        let denied = service
            .clone()
            .oneshot(axum::http::Request::get("/locations").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let public = service
            .clone()
            .oneshot(axum::http::Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(public.status(), StatusCode::NO_CONTENT);

        let admitted = service
            .oneshot(
                axum::http::Request::get("/locations")
                    .header(AUTHORIZATION, format!("Bearer {}{}", IDENTIFIER, TOKEN))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(admitted.status(), StatusCode::OK);
    }
}
