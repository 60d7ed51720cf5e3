//! Domain records exposed by the Application API.
//!
//! Each record type maps to one resource kind. The kind carries the object
//! tag used in envelopes, the capability guarding reads of it, and the
//! static table of relationships it may embed.

pub mod location;
pub mod node;
pub mod relationships;
pub mod server;

pub use location::Location;
pub use node::Node;
pub use relationships::{Cardinality, Relation, RelationshipSpec};
pub use server::{FeatureLimits, Server, ServerLimits};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rbac::Capability;

/// The closed set of resource types the API serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Location,
    Node,
    Server,
}

impl ResourceKind {
    /// Object tag rendered in single-resource envelopes.
    pub const fn object_name(self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Node => "node",
            Self::Server => "server",
        }
    }

    /// Capability required to read this kind at all.
    pub const fn read_capability(self) -> Capability {
        match self {
            Self::Location => Capability::Locations,
            Self::Node => Capability::Nodes,
            Self::Server => Capability::Servers,
        }
    }

    /// Relationships this kind can embed, in declaration order.
    pub const fn relationships(self) -> &'static [RelationshipSpec] {
        match self {
            Self::Location => relationships::LOCATION_RELATIONSHIPS,
            Self::Node => relationships::NODE_RELATIONSHIPS,
            Self::Server => relationships::SERVER_RELATIONSHIPS,
        }
    }

    /// Look up a declared relationship by name.
    pub fn relationship(self, name: &str) -> Option<&'static RelationshipSpec> {
        self.relationships().iter().find(|spec| spec.name == name)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.object_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_capabilities() {
        assert_eq!(ResourceKind::Location.read_capability(), Capability::Locations);
        assert_eq!(ResourceKind::Node.read_capability(), Capability::Nodes);
        assert_eq!(ResourceKind::Server.read_capability(), Capability::Servers);
    }

    #[test]
    fn test_relationship_lookup() {
        let nodes = ResourceKind::Location.relationship("nodes").unwrap();
        assert_eq!(nodes.capability, Capability::Nodes);
        assert_eq!(nodes.target, ResourceKind::Node);
        assert_eq!(nodes.cardinality, Cardinality::Many);

        assert!(ResourceKind::Location.relationship("allocations").is_none());
        assert!(ResourceKind::Server.relationship("servers").is_none());
    }

    #[test]
    fn test_display_uses_object_name() {
        assert_eq!(ResourceKind::Server.to_string(), "server");
    }
}
