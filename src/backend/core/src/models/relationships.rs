//! Static relationship tables.

use super::ResourceKind;
use crate::rbac::Capability;

/// How many related records a relationship yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Every relationship edge the repository knows how to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    LocationNodes,
    LocationServers,
    NodeLocation,
    NodeServers,
    ServerLocation,
    ServerNode,
}

/// One entry of a resource kind's relationship table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipSpec {
    /// Name accepted in `include` and used as the key under `relationships`
    pub name: &'static str,
    pub relation: Relation,
    /// Capability the API key needs for the relationship to be loaded
    pub capability: Capability,
    pub target: ResourceKind,
    pub cardinality: Cardinality,
}

pub const LOCATION_RELATIONSHIPS: &[RelationshipSpec] = &[
    RelationshipSpec {
        name: "nodes",
        relation: Relation::LocationNodes,
        capability: Capability::Nodes,
        target: ResourceKind::Node,
        cardinality: Cardinality::Many,
    },
    RelationshipSpec {
        name: "servers",
        relation: Relation::LocationServers,
        capability: Capability::Servers,
        target: ResourceKind::Server,
        cardinality: Cardinality::Many,
    },
];

pub const NODE_RELATIONSHIPS: &[RelationshipSpec] = &[
    RelationshipSpec {
        name: "location",
        relation: Relation::NodeLocation,
        capability: Capability::Locations,
        target: ResourceKind::Location,
        cardinality: Cardinality::One,
    },
    RelationshipSpec {
        name: "servers",
        relation: Relation::NodeServers,
        capability: Capability::Servers,
        target: ResourceKind::Server,
        cardinality: Cardinality::Many,
    },
];

pub const SERVER_RELATIONSHIPS: &[RelationshipSpec] = &[
    RelationshipSpec {
        name: "location",
        relation: Relation::ServerLocation,
        capability: Capability::Locations,
        target: ResourceKind::Location,
        cardinality: Cardinality::One,
    },
    RelationshipSpec {
        name: "node",
        relation: Relation::ServerNode,
        capability: Capability::Nodes,
        target: ResourceKind::Node,
        cardinality: Cardinality::One,
    },
];
