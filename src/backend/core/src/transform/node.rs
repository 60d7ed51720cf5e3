use serde_json::{json, Map, Value};

use super::{format_timestamp, into_object, Transformer};
use crate::models::{Node, ResourceKind};

impl Transformer for Node {
    const KIND: ResourceKind = ResourceKind::Node;

    fn attributes(&self) -> Map<String, Value> {
        into_object(json!({
            "id": self.id,
            "uuid": self.uuid.to_string(),
            "public": self.public,
            "name": self.name,
            "description": self.description,
            "location_id": self.location_id,
            "fqdn": self.fqdn,
            "scheme": self.scheme,
            "behind_proxy": self.behind_proxy,
            "maintenance_mode": self.maintenance_mode,
            "memory": self.memory,
            "memory_overallocate": self.memory_overallocate,
            "disk": self.disk,
            "disk_overallocate": self.disk_overallocate,
            "upload_size": self.upload_size,
            "daemon_listen": self.daemon_listen,
            "daemon_sftp": self.daemon_sftp,
            "daemon_base": self.daemon_base,
            "created_at": format_timestamp(&self.created_at),
            "updated_at": format_timestamp(&self.updated_at),
        }))
    }
}
