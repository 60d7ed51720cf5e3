//! In-memory repository.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use super::{Page, ResourceRepository};
use crate::error::{ErrorContext, Result};
use crate::models::{Location, Node, Server};
use crate::pagination::{ListRequest, SortDirection};

/// Records loaded from a JSON seed file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub servers: Vec<Server>,
}

/// Repository backed by ordered maps behind `RwLock`s.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    locations: RwLock<BTreeMap<i64, Location>>,
    nodes: RwLock<BTreeMap<i64, Node>>,
    servers: RwLock<BTreeMap<i64, Server>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: SeedData) -> Self {
        let repo = Self::new();
        for location in seed.locations {
            repo.insert_location(location);
        }
        for node in seed.nodes {
            repo.insert_node(node);
        }
        for server in seed.servers {
            repo.insert_server(server);
        }
        repo
    }

    /// Load a JSON seed file of `{locations, nodes, servers}`.
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .context(format!("failed to read seed file {}", path.display()))?;
        let seed: SeedData = serde_json::from_str(&raw)?;

        info!(
            path = %path.display(),
            locations = seed.locations.len(),
            nodes = seed.nodes.len(),
            servers = seed.servers.len(),
            "Loaded repository seed"
        );

        Ok(Self::from_seed(seed))
    }

    /// Insert or replace a location. An id of 0 or less is assigned.
    pub fn insert_location(&self, mut location: Location) -> Location {
        let mut locations = self.locations.write();
        if location.id <= 0 {
            location.id = next_id(&locations);
        }
        locations.insert(location.id, location.clone());
        location
    }

    /// Insert or replace a node. An id of 0 or less is assigned.
    pub fn insert_node(&self, mut node: Node) -> Node {
        let mut nodes = self.nodes.write();
        if node.id <= 0 {
            node.id = next_id(&nodes);
        }
        nodes.insert(node.id, node.clone());
        node
    }

    /// Insert or replace a server. An id of 0 or less is assigned.
    pub fn insert_server(&self, mut server: Server) -> Server {
        let mut servers = self.servers.write();
        if server.id <= 0 {
            server.id = next_id(&servers);
        }
        servers.insert(server.id, server.clone());
        server
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.locations.read().len(),
            self.nodes.read().len(),
            self.servers.read().len(),
        )
    }
}

fn next_id<T>(map: &BTreeMap<i64, T>) -> i64 {
    map.keys().next_back().map_or(1, |id| id + 1)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Filtering and Sorting
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Missing,
    Int(i64),
    Text(String),
}

/// Field access used to evaluate a `ListRequest` in memory.
trait Queryable: Clone {
    fn id(&self) -> i64;

    fn text_field(&self, field: &str) -> Option<String>;

    fn sort_key(&self, field: &str) -> SortKey;
}

impl Queryable for Location {
    fn id(&self) -> i64 {
        self.id
    }

    fn text_field(&self, field: &str) -> Option<String> {
        match field {
            "short" => Some(self.short.clone()),
            "long" => self.long.clone(),
            _ => None,
        }
    }

    fn sort_key(&self, field: &str) -> SortKey {
        match field {
            "id" => SortKey::Int(self.id),
            "short" => SortKey::Text(self.short.clone()),
            _ => SortKey::Missing,
        }
    }
}

impl Queryable for Node {
    fn id(&self) -> i64 {
        self.id
    }

    fn text_field(&self, field: &str) -> Option<String> {
        match field {
            "uuid" => Some(self.uuid.to_string()),
            "name" => Some(self.name.clone()),
            "fqdn" => Some(self.fqdn.clone()),
            _ => None,
        }
    }

    fn sort_key(&self, field: &str) -> SortKey {
        match field {
            "id" => SortKey::Int(self.id),
            "uuid" => SortKey::Text(self.uuid.to_string()),
            "memory" => SortKey::Int(self.memory),
            "disk" => SortKey::Int(self.disk),
            _ => SortKey::Missing,
        }
    }
}

impl Queryable for Server {
    fn id(&self) -> i64 {
        self.id
    }

    fn text_field(&self, field: &str) -> Option<String> {
        match field {
            "uuid" => Some(self.uuid.to_string()),
            "name" => Some(self.name.clone()),
            "external_id" => self.external_id.clone(),
            "description" => Some(self.description.clone()),
            _ => None,
        }
    }

    fn sort_key(&self, field: &str) -> SortKey {
        match field {
            "id" => SortKey::Int(self.id),
            "uuid" => SortKey::Text(self.uuid.to_string()),
            _ => SortKey::Missing,
        }
    }
}

fn apply<'a, T, I>(records: I, request: &ListRequest) -> Page<T>
where
    T: Queryable + 'a,
    I: Iterator<Item = &'a T>,
{
    let mut matched: Vec<T> = records
        .filter(|record| {
            request.filters.iter().all(|filter| {
                record.text_field(filter.field).is_some_and(|value| {
                    value.to_lowercase().contains(&filter.value.to_lowercase())
                })
            })
        })
        .cloned()
        .collect();

    if !request.sorts.is_empty() {
        matched.sort_by(|a, b| {
            for sort in &request.sorts {
                let ordering = a.sort_key(sort.field).cmp(&b.sort_key(sort.field));
                let ordering = match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.id().cmp(&b.id())
        });
    }

    let total = matched.len() as u64;
    (request.pagination.paginate_iter(matched.into_iter()), total)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Repository Implementation
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl ResourceRepository for InMemoryRepository {
    async fn list_locations(&self, request: &ListRequest) -> Result<Page<Location>> {
        Ok(apply(self.locations.read().values(), request))
    }

    async fn find_location(&self, id: i64) -> Result<Option<Location>> {
        Ok(self.locations.read().get(&id).cloned())
    }

    async fn nodes_for_location(&self, location_id: i64) -> Result<Vec<Node>> {
        Ok(self
            .nodes
            .read()
            .values()
            .filter(|node| node.location_id == location_id)
            .cloned()
            .collect())
    }

    async fn servers_for_location(&self, location_id: i64) -> Result<Vec<Server>> {
        let node_ids: Vec<i64> = self
            .nodes
            .read()
            .values()
            .filter(|node| node.location_id == location_id)
            .map(|node| node.id)
            .collect();

        Ok(self
            .servers
            .read()
            .values()
            .filter(|server| node_ids.contains(&server.node_id))
            .cloned()
            .collect())
    }

    async fn list_nodes(&self, request: &ListRequest) -> Result<Page<Node>> {
        Ok(apply(self.nodes.read().values(), request))
    }

    async fn find_node(&self, id: i64) -> Result<Option<Node>> {
        Ok(self.nodes.read().get(&id).cloned())
    }

    async fn servers_for_node(&self, node_id: i64) -> Result<Vec<Server>> {
        Ok(self
            .servers
            .read()
            .values()
            .filter(|server| server.node_id == node_id)
            .cloned()
            .collect())
    }

    async fn list_servers(&self, request: &ListRequest) -> Result<Page<Server>> {
        Ok(apply(self.servers.read().values(), request))
    }

    async fn find_server(&self, id: i64) -> Result<Option<Server>> {
        Ok(self.servers.read().get(&id).cloned())
    }

    async fn location_for_server(&self, server_id: i64) -> Result<Option<Location>> {
        let node_id = match self.servers.read().get(&server_id) {
            Some(server) => server.node_id,
            None => return Ok(None),
        };
        let location_id = match self.nodes.read().get(&node_id) {
            Some(node) => node.location_id,
            None => return Ok(None),
        };
        Ok(self.locations.read().get(&location_id).cloned())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn repo() -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        repo.insert_location(Location::new(0, "us.nyc", Some("New York".to_string())));
        repo.insert_location(Location::new(0, "us.lax", Some("Los Angeles".to_string())));
        repo.insert_location(Location::new(0, "eu.ams", Some("Amsterdam".to_string())));
        repo
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let repo = repo();
        let ids: Vec<i64> = repo.locations.read().keys().copied().collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_list_paginates_and_counts() {
        let repo = repo();
        let (items, total) = repo.list_locations(&ListRequest::page(2, 2)).await.unwrap();

        assert_eq!(total, 3);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].short, "eu.ams");
    }

    #[tokio::test]
    async fn test_filter_is_case_insensitive_substring() {
        let repo = repo();
        let request = ListRequest::page(1, 10).with_filter("short", "US.");
        let (items, total) = repo.list_locations(&request).await.unwrap();

        assert_eq!(total, 2);
        assert!(items.iter().all(|location| location.short.starts_with("us.")));
    }

    #[tokio::test]
    async fn test_sort_descending() {
        let repo = repo();
        let request = ListRequest::page(1, 10).with_sort("id", SortDirection::Desc);
        let (items, _) = repo.list_locations(&request).await.unwrap();

        let ids: Vec<i64> = items.iter().map(|location| location.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_servers_for_location_go_through_nodes() {
        let repo = repo();
        repo.insert_node(Node::new(0, 1, "nyc-1", "nyc-1.example.com"));
        repo.insert_node(Node::new(0, 2, "lax-1", "lax-1.example.com"));
        repo.insert_server(Server::new(0, 1, "lobby"));
        repo.insert_server(Server::new(0, 2, "survival"));

        let servers = repo.servers_for_location(1).await.unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].name, "lobby");

        let location = repo.location_for_server(2).await.unwrap().unwrap();
        assert_eq!(location.short, "us.lax");

        assert!(repo.location_for_server(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_seed_file() {
        let location = Location::new(5, "ap.syd", None);
        let node = Node::new(9, 5, "syd-1", "syd-1.example.com");
        let seed = serde_json::json!({
            "locations": [location],
            "nodes": [node],
        });

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", seed).unwrap();

        let repo = InMemoryRepository::from_seed_file(file.path()).unwrap();
        assert_eq!(repo.counts(), (1, 1, 0));
        assert_eq!(repo.find_location(5).await.unwrap().unwrap().short, "ap.syd");
        assert_eq!(repo.nodes_for_location(5).await.unwrap().len(), 1);
    }

    #[test]
    fn test_missing_seed_file_is_error() {
        assert!(InMemoryRepository::from_seed_file("/nonexistent/seed.json").is_err());
    }
}
