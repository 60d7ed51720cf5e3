use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A machine running the daemon that hosts servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Node {
    pub id: i64,
    pub uuid: Uuid,
    pub public: bool,
    pub name: String,
    pub description: Option<String>,
    pub location_id: i64,
    pub fqdn: String,
    pub scheme: String,
    pub behind_proxy: bool,
    pub maintenance_mode: bool,
    pub memory: i64,
    pub memory_overallocate: i64,
    pub disk: i64,
    pub disk_overallocate: i64,
    pub upload_size: i64,
    pub daemon_listen: i64,
    pub daemon_sftp: i64,
    pub daemon_base: String,
    /// Daemon credential identifier; never rendered by the API
    #[serde(default, skip_serializing)]
    pub daemon_token_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// A node in `location_id` with the panel's stock defaults.
    pub fn new(id: i64, location_id: i64, name: impl Into<String>, fqdn: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            uuid: Uuid::new_v4(),
            public: true,
            name: name.into(),
            description: None,
            location_id,
            fqdn: fqdn.into(),
            scheme: "https".to_string(),
            behind_proxy: false,
            maintenance_mode: false,
            memory: 1024,
            memory_overallocate: 0,
            disk: 10240,
            disk_overallocate: 0,
            upload_size: 100,
            daemon_listen: 8080,
            daemon_sftp: 2022,
            daemon_base: "/var/lib/panel/volumes".to_string(),
            daemon_token_id: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
