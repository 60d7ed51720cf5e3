use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Resource limits enforced by the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerLimits {
    pub memory: i64,
    pub swap: i64,
    pub disk: i64,
    pub io: i64,
    pub cpu: i64,
    pub threads: Option<String>,
    pub oom_disabled: bool,
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            memory: 512,
            swap: 0,
            disk: 1024,
            io: 500,
            cpu: 100,
            threads: None,
            oom_disabled: true,
        }
    }
}

/// Panel-side feature quotas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLimits {
    pub databases: i64,
    pub allocations: i64,
    pub backups: i64,
}

/// A game server hosted on a node.
///
/// Servers reach a location only through their node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: i64,
    pub external_id: Option<String>,
    pub uuid: Uuid,
    pub name: String,
    pub description: String,
    /// `None` once installed and running normally
    pub status: Option<String>,
    pub limits: ServerLimits,
    pub feature_limits: FeatureLimits,
    pub owner_id: i64,
    pub node_id: i64,
    pub allocation_id: i64,
    pub nest_id: i64,
    pub egg_id: i64,
    pub startup: String,
    pub image: String,
    pub installed: bool,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Server {
    pub fn new(id: i64, node_id: i64, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            external_id: None,
            uuid: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            status: None,
            limits: ServerLimits::default(),
            feature_limits: FeatureLimits::default(),
            owner_id: 1,
            node_id,
            allocation_id: id,
            nest_id: 1,
            egg_id: 1,
            startup: "java -Xms128M -Xmx{{SERVER_MEMORY}}M -jar {{SERVER_JARFILE}}".to_string(),
            image: "ghcr.io/pterodactyl/yolks:java_17".to_string(),
            installed: true,
            environment: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Short identifier: the first 8 characters of the uuid.
    pub fn identifier(&self) -> String {
        self.uuid.to_string()[..8].to_string()
    }

    pub fn is_suspended(&self) -> bool {
        self.status.as_deref() == Some("suspended")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_is_uuid_prefix() {
        let server = Server::new(1, 1, "lobby");
        assert_eq!(server.identifier().len(), 8);
        assert!(server.uuid.to_string().starts_with(&server.identifier()));
    }

    #[test]
    fn test_suspended_follows_status() {
        let mut server = Server::new(1, 1, "lobby");
        assert!(!server.is_suspended());

        server.status = Some("suspended".to_string());
        assert!(server.is_suspended());
    }
}
