//! Resource transformation: domain records into API envelopes.
//!
//! ```json
//! {"object": "location", "attributes": {"id": 1, "short": "us.nyc", ...}}
//! ```
//!
//! Relationships are embedded under `attributes.relationships.<name>` only
//! when requested through `include`. A relationship the key may not read
//! renders as `null_resource` and is never fetched.

pub mod includes;
pub mod loader;
mod location;
mod node;
mod server;

pub use includes::{parse_include, resolve_includes, ResolvedInclude};
pub use loader::{Related, RelationshipLoader};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::db::ResourceRepository;
use crate::error::{PanelError, Result};
use crate::models::{Location, Node, ResourceKind, Server};
use crate::pagination::LIST_OBJECT;
use crate::rbac::AccessScope;
use crate::telemetry::{ApiMetrics, RelationshipOutcome};

/// Object tag rendered for denied or absent relationships.
pub const NULL_RESOURCE_OBJECT: &str = "null_resource";

// ═══════════════════════════════════════════════════════════════════════════════
// Transformer Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Maps a record to its canonical attribute set.
pub trait Transformer {
    const KIND: ResourceKind;

    /// Declared scalar attributes plus timestamps; never relationships.
    fn attributes(&self) -> Map<String, Value>;
}

/// Canonical timestamp rendering: `2024-01-31T12:00:00+00:00`.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Resource
// ═══════════════════════════════════════════════════════════════════════════════

/// Any record the API can render.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Location(Location),
    Node(Node),
    Server(Server),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Location(_) => Location::KIND,
            Self::Node(_) => Node::KIND,
            Self::Server(_) => Server::KIND,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Self::Location(location) => location.id,
            Self::Node(node) => node.id,
            Self::Server(server) => server.id,
        }
    }

    pub fn attributes(&self) -> Map<String, Value> {
        match self {
            Self::Location(location) => location.attributes(),
            Self::Node(node) => node.attributes(),
            Self::Server(server) => server.attributes(),
        }
    }
}

impl From<Location> for Resource {
    fn from(location: Location) -> Self {
        Self::Location(location)
    }
}

impl From<Node> for Resource {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<Server> for Resource {
    fn from(server: Server) -> Self {
        Self::Server(server)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Envelopes
// ═══════════════════════════════════════════════════════════════════════════════

/// A single transformed resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub object: &'static str,
    pub attributes: Map<String, Value>,
}

impl Item {
    /// Base transform without relationships.
    pub fn from_resource(resource: &Resource) -> Self {
        Self {
            object: resource.kind().object_name(),
            attributes: resource.attributes(),
        }
    }

    /// Embedded relationships, if any were rendered.
    pub fn relationships(&self) -> Option<&Map<String, Value>> {
        self.attributes.get("relationships").and_then(Value::as_object)
    }

    /// Embed relationship results; omitted ones leave no key.
    ///
    /// Without any rendered relationship the `relationships` key is absent.
    pub fn with_relationships(
        mut self,
        relationships: impl IntoIterator<Item = (&'static str, RelationshipResult)>,
    ) -> Result<Self> {
        let mut rendered = Map::new();
        for (name, result) in relationships {
            if let Some(value) = result.into_value()? {
                rendered.insert(name.to_string(), value);
            }
        }

        if !rendered.is_empty() {
            self.attributes
                .insert("relationships".to_string(), Value::Object(rendered));
        }
        Ok(self)
    }
}

/// A loaded relationship: one item or a plain list (no pagination meta).
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Item(Item),
    List(Vec<Item>),
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Item(item) => item.serialize(serializer),
            Self::List(items) => {
                let mut state = serializer.serialize_struct("List", 2)?;
                state.serialize_field("object", LIST_OBJECT)?;
                state.serialize_field("data", items)?;
                state.end()
            }
        }
    }
}

/// How one requested relationship renders.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationshipResult {
    Loaded(Envelope),
    /// Denied, or a one-to-one with no target
    NullResource,
    /// Not requested
    Omitted,
}

impl RelationshipResult {
    pub fn into_value(self) -> Result<Option<Value>> {
        Ok(match self {
            Self::Loaded(envelope) => Some(serde_json::to_value(envelope)?),
            Self::NullResource => Some(json!({
                "object": NULL_RESOURCE_OBJECT,
                "attributes": null,
            })),
            Self::Omitted => None,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Resource Transformer
// ═══════════════════════════════════════════════════════════════════════════════

/// Transforms resources of one kind, applying a request's `include` set.
pub struct ResourceTransformer<'a> {
    kind: ResourceKind,
    includes: Vec<ResolvedInclude>,
    loader: RelationshipLoader<'a>,
}

impl<'a> ResourceTransformer<'a> {
    /// Resolve `raw_include` for `kind` against the caller's scope.
    pub fn new(
        repository: &'a dyn ResourceRepository,
        kind: ResourceKind,
        raw_include: Option<&str>,
        scope: &AccessScope,
    ) -> Self {
        let requested = parse_include(raw_include);
        let includes = resolve_includes(&requested, kind, scope);

        Self {
            kind,
            includes,
            loader: RelationshipLoader::new(repository),
        }
    }

    pub fn includes(&self) -> &[ResolvedInclude] {
        &self.includes
    }

    /// Base transform.
    pub fn transform(&self, resource: &Resource) -> Item {
        Item::from_resource(resource)
    }

    /// Render one relationship of `resource`.
    pub async fn transform_include(&self, resource: &Resource, name: &str) -> Result<RelationshipResult> {
        if resource.kind() != self.kind {
            return Err(PanelError::internal(format!(
                "transformer for {} received a {}",
                self.kind,
                resource.kind()
            )));
        }

        let Some(include) = self.includes.iter().find(|include| include.spec.name == name) else {
            return Ok(RelationshipResult::Omitted);
        };

        if !include.permitted {
            debug!(
                resource = %self.kind,
                relationship = include.spec.name,
                capability = %include.spec.capability,
                "Relationship denied"
            );
            ApiMetrics::record_relationship(
                self.kind.object_name(),
                include.spec.name,
                RelationshipOutcome::Denied,
            );
            return Ok(RelationshipResult::NullResource);
        }

        let related = self.loader.load(resource, include.spec).await?;
        ApiMetrics::record_relationship(
            self.kind.object_name(),
            include.spec.name,
            RelationshipOutcome::Loaded,
        );

        Ok(match related {
            Related::Many(resources) => RelationshipResult::Loaded(Envelope::List(
                resources.iter().map(Item::from_resource).collect(),
            )),
            Related::One(Some(target)) => {
                RelationshipResult::Loaded(Envelope::Item(Item::from_resource(&target)))
            }
            Related::One(None) => RelationshipResult::NullResource,
        })
    }

    /// Base transform plus every requested relationship, in declaration order.
    pub async fn transform_with_includes(&self, resource: &Resource) -> Result<Item> {
        let mut relationships = Vec::with_capacity(self.includes.len());
        for include in &self.includes {
            let result = self.transform_include(resource, include.spec.name).await?;
            relationships.push((include.spec.name, result));
        }

        self.transform(resource).with_relationships(relationships)
    }

    /// Transform a page of resources.
    pub async fn transform_all(&self, resources: &[Resource]) -> Result<Vec<Item>> {
        let mut items = Vec::with_capacity(resources.len());
        for resource in resources {
            items.push(self.transform_with_includes(resource).await?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 5).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-31T12:00:05+00:00");
    }

    #[test]
    fn test_null_resource_value() {
        assert_eq!(
            RelationshipResult::NullResource.into_value().unwrap(),
            Some(json!({ "object": "null_resource", "attributes": null }))
        );
        assert_eq!(RelationshipResult::Omitted.into_value().unwrap(), None);
    }

    #[test]
    fn test_loaded_item_value() {
        let location = Location::new(3, "eu.ams", Some("Amsterdam".to_string()));
        let item = Item::from_resource(&Resource::from(location));

        let value = RelationshipResult::Loaded(Envelope::Item(item.clone()))
            .into_value()
            .unwrap()
            .unwrap();

        assert_eq!(value["object"], "location");
        assert_eq!(value["attributes"], serde_json::to_value(&item.attributes).unwrap());
    }

    #[test]
    fn test_list_envelope_has_no_meta() {
        let envelope = Envelope::List(Vec::new());
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({ "object": "list", "data": [] })
        );
    }

    #[test]
    fn test_with_relationships_skips_omitted() {
        let location = Location::new(1, "us.nyc", None);
        let item = Item::from_resource(&Resource::from(location))
            .with_relationships([("nodes", RelationshipResult::Omitted)])
            .unwrap();

        assert!(item.relationships().is_none());

        let location = Location::new(1, "us.nyc", None);
        let item = Item::from_resource(&Resource::from(location)).with_relationships([
            ("nodes", RelationshipResult::NullResource),
            ("servers", RelationshipResult::Loaded(Envelope::List(Vec::new()))),
        ])
        .unwrap();

        let relationships = item.relationships().unwrap();
        assert_eq!(relationships.len(), 2);
        assert_eq!(relationships["servers"], json!({ "object": "list", "data": [] }));
    }

    #[test]
    fn test_resource_kind_dispatch() {
        let node = Node::new(4, 1, "node-a", "a.example.com");
        let resource = Resource::from(node);

        assert_eq!(resource.kind(), ResourceKind::Node);
        assert_eq!(resource.id(), 4);
        assert_eq!(Item::from_resource(&resource).object, "node");
    }
}
