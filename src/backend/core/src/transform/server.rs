use serde_json::{json, Map, Value};

use super::{format_timestamp, into_object, Transformer};
use crate::models::{ResourceKind, Server};

impl Transformer for Server {
    const KIND: ResourceKind = ResourceKind::Server;

    fn attributes(&self) -> Map<String, Value> {
        into_object(json!({
            "id": self.id,
            "external_id": self.external_id,
            "uuid": self.uuid.to_string(),
            "identifier": self.identifier(),
            "name": self.name,
            "description": self.description,
            "status": self.status,
            "suspended": self.is_suspended(),
            "limits": {
                "memory": self.limits.memory,
                "swap": self.limits.swap,
                "disk": self.limits.disk,
                "io": self.limits.io,
                "cpu": self.limits.cpu,
                "threads": self.limits.threads,
                "oom_disabled": self.limits.oom_disabled,
            },
            "feature_limits": {
                "databases": self.feature_limits.databases,
                "allocations": self.feature_limits.allocations,
                "backups": self.feature_limits.backups,
            },
            "user": self.owner_id,
            "node": self.node_id,
            "allocation": self.allocation_id,
            "nest": self.nest_id,
            "egg": self.egg_id,
            "container": {
                "startup_command": self.startup,
                "image": self.image,
                "installed": u8::from(self.installed),
                "environment": self.environment,
            },
            "updated_at": format_timestamp(&self.updated_at),
            "created_at": format_timestamp(&self.created_at),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_attributes() {
        let mut server = Server::new(12, 3, "lobby");
        server.status = Some("suspended".to_string());
        server.environment.insert("SERVER_JARFILE".to_string(), "server.jar".to_string());

        let attributes = server.attributes();
        assert_eq!(attributes["identifier"], server.identifier());
        assert_eq!(attributes["suspended"], true);
        assert_eq!(attributes["node"], 3);
        assert_eq!(attributes["limits"]["oom_disabled"], true);
        assert_eq!(attributes["container"]["installed"], 1);
        assert_eq!(attributes["container"]["environment"]["SERVER_JARFILE"], "server.jar");
    }
}
