use serde_json::{json, Map, Value};

use super::{format_timestamp, into_object, Transformer};
use crate::models::{Location, ResourceKind};

impl Transformer for Location {
    const KIND: ResourceKind = ResourceKind::Location;

    fn attributes(&self) -> Map<String, Value> {
        into_object(json!({
            "id": self.id,
            "short": self.short,
            "long": self.long,
            "created_at": format_timestamp(&self.created_at),
            "updated_at": format_timestamp(&self.updated_at),
        }))
    }
}
