#![allow(clippy::result_large_err)]
//! # Panel Core
//!
//! Read-only Application API for a game server panel.
//!
//! ## Architecture
//!
//! - **Models**: Locations, nodes and servers, plus the static relationship tables
//! - **RBAC**: Per-key read scopes (`r_locations`, `r_nodes`, ...) and the policy evaluator
//! - **Transform**: Records into `{object, attributes}` envelopes with gated `include` relationships
//! - **Pagination**: Query parsing, offset pagination and the `meta.pagination` block
//! - **DB**: Repository trait with in-memory and PostgreSQL implementations
//! - **Middleware**: Bearer API key authentication
//! - **Telemetry**: Structured logging and Prometheus metrics

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod rbac;
pub mod telemetry;
pub mod transform;

pub use error::{ErrorCode, ErrorContext, ErrorSeverity, PanelError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{build_router, AppState};
    pub use crate::config::Config;
    pub use crate::db::{InMemoryRepository, PgRepository, ResourceRepository, SeedData};
    pub use crate::error::{ErrorCode, ErrorContext, ErrorSeverity, PanelError, Result};
    pub use crate::middleware::{ApiKeyStore, AuthContext, AuthLayer};
    pub use crate::models::{Location, Node, ResourceKind, Server};
    pub use crate::pagination::{ListQuery, ListRequest, OffsetPagination, PaginatedList};
    pub use crate::rbac::{AccessScope, Capability, PermissionEvaluator};
    pub use crate::transform::{Item, Resource, ResourceTransformer};
}
