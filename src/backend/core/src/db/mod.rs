//! Repository layer.
//!
//! Handlers and the relationship loader talk to storage only through
//! [`ResourceRepository`]. Two implementations ship:
//!
//! - [`InMemoryRepository`]: process-local maps, optionally seeded from JSON
//! - [`PgRepository`]: PostgreSQL via sqlx

mod memory;
mod postgres;

pub use memory::{InMemoryRepository, SeedData};
pub use postgres::PgRepository;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Location, Node, Server};
use crate::pagination::ListRequest;

/// One page of records plus the total matching the request's filters.
pub type Page<T> = (Vec<T>, u64);

/// Read access to locations, nodes and servers.
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Locations
    // ─────────────────────────────────────────────────────────────────────────

    async fn list_locations(&self, request: &ListRequest) -> Result<Page<Location>>;

    async fn find_location(&self, id: i64) -> Result<Option<Location>>;

    /// Nodes placed in the location, ordered by id.
    async fn nodes_for_location(&self, location_id: i64) -> Result<Vec<Node>>;

    /// Servers on any node of the location, ordered by id.
    async fn servers_for_location(&self, location_id: i64) -> Result<Vec<Server>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Nodes
    // ─────────────────────────────────────────────────────────────────────────

    async fn list_nodes(&self, request: &ListRequest) -> Result<Page<Node>>;

    async fn find_node(&self, id: i64) -> Result<Option<Node>>;

    /// Servers hosted on the node, ordered by id.
    async fn servers_for_node(&self, node_id: i64) -> Result<Vec<Server>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Servers
    // ─────────────────────────────────────────────────────────────────────────

    async fn list_servers(&self, request: &ListRequest) -> Result<Page<Server>>;

    async fn find_server(&self, id: i64) -> Result<Option<Server>>;

    /// The location of the server's node.
    async fn location_for_server(&self, server_id: i64) -> Result<Option<Location>>;

    /// Liveness check for `/health`.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
