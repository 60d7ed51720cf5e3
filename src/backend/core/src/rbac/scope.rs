//! Per-key read capabilities.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// Capability
// ═══════════════════════════════════════════════════════════════════════════════

/// A named read capability an application API key may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Servers,
    Nodes,
    Allocations,
    Users,
    Locations,
    Nests,
    Eggs,
    DatabaseHosts,
    ServerDatabases,
}

impl Capability {
    pub const ALL: [Capability; 9] = [
        Self::Servers,
        Self::Nodes,
        Self::Allocations,
        Self::Users,
        Self::Locations,
        Self::Nests,
        Self::Eggs,
        Self::DatabaseHosts,
        Self::ServerDatabases,
    ];

    /// Flag name as stored on the key, e.g. `r_locations`.
    pub const fn flag_name(self) -> &'static str {
        match self {
            Self::Servers => "r_servers",
            Self::Nodes => "r_nodes",
            Self::Allocations => "r_allocations",
            Self::Users => "r_users",
            Self::Locations => "r_locations",
            Self::Nests => "r_nests",
            Self::Eggs => "r_eggs",
            Self::DatabaseHosts => "r_database_hosts",
            Self::ServerDatabases => "r_server_databases",
        }
    }

    pub fn from_flag_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cap| cap.flag_name() == name)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag_name())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Access Scope
// ═══════════════════════════════════════════════════════════════════════════════

/// The explicit set of read capabilities carried by one API key.
///
/// Flags deserialize from booleans or from integer permission levels, where
/// bit 1 means read (so `1` and `3` grant, `0` and `2` do not). Missing
/// flags are not granted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessScope {
    #[serde(default, deserialize_with = "read_flag")]
    pub r_servers: bool,
    #[serde(default, deserialize_with = "read_flag")]
    pub r_nodes: bool,
    #[serde(default, deserialize_with = "read_flag")]
    pub r_allocations: bool,
    #[serde(default, deserialize_with = "read_flag")]
    pub r_users: bool,
    #[serde(default, deserialize_with = "read_flag")]
    pub r_locations: bool,
    #[serde(default, deserialize_with = "read_flag")]
    pub r_nests: bool,
    #[serde(default, deserialize_with = "read_flag")]
    pub r_eggs: bool,
    #[serde(default, deserialize_with = "read_flag")]
    pub r_database_hosts: bool,
    #[serde(default, deserialize_with = "read_flag")]
    pub r_server_databases: bool,
}

impl AccessScope {
    /// A scope with no capabilities.
    pub fn none() -> Self {
        Self::default()
    }

    /// A scope holding every capability.
    pub fn full() -> Self {
        Capability::ALL
            .into_iter()
            .fold(Self::none(), |scope, cap| scope.grant(cap))
    }

    /// Whether the scope holds `capability`.
    pub const fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Servers => self.r_servers,
            Capability::Nodes => self.r_nodes,
            Capability::Allocations => self.r_allocations,
            Capability::Users => self.r_users,
            Capability::Locations => self.r_locations,
            Capability::Nests => self.r_nests,
            Capability::Eggs => self.r_eggs,
            Capability::DatabaseHosts => self.r_database_hosts,
            Capability::ServerDatabases => self.r_server_databases,
        }
    }

    pub fn grant(mut self, capability: Capability) -> Self {
        *self.flag_mut(capability) = true;
        self
    }

    pub fn revoke(mut self, capability: Capability) -> Self {
        *self.flag_mut(capability) = false;
        self
    }

    /// Capabilities held, in canonical order.
    pub fn granted(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|cap| self.allows(*cap))
            .collect()
    }

    fn flag_mut(&mut self, capability: Capability) -> &mut bool {
        match capability {
            Capability::Servers => &mut self.r_servers,
            Capability::Nodes => &mut self.r_nodes,
            Capability::Allocations => &mut self.r_allocations,
            Capability::Users => &mut self.r_users,
            Capability::Locations => &mut self.r_locations,
            Capability::Nests => &mut self.r_nests,
            Capability::Eggs => &mut self.r_eggs,
            Capability::DatabaseHosts => &mut self.r_database_hosts,
            Capability::ServerDatabases => &mut self.r_server_databases,
        }
    }
}

impl FromIterator<Capability> for AccessScope {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), |scope, cap| scope.grant(cap))
    }
}

/// Read permission bit of an integer permission level.
const READ_BIT: i64 = 1;

fn read_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Level(i64),
        // environment variables arrive as strings
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Level(level) => Ok(level & READ_BIT != 0),
        Flag::Text(text) => match text.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => other
                .parse::<i64>()
                .map(|level| level & READ_BIT != 0)
                .map_err(|_| serde::de::Error::custom(format!("invalid permission flag {:?}", other))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_and_none() {
        let full = AccessScope::full();
        let none = AccessScope::none();

        for cap in Capability::ALL {
            assert!(full.allows(cap), "{} missing from full scope", cap);
            assert!(!none.allows(cap), "{} present in empty scope", cap);
        }
    }

    #[test]
    fn test_revoke_only_touches_one_flag() {
        let scope = AccessScope::full().revoke(Capability::Nodes);

        assert!(!scope.allows(Capability::Nodes));
        assert_eq!(scope.granted().len(), Capability::ALL.len() - 1);
    }

    #[test]
    fn test_flag_names_roundtrip() {
        for cap in Capability::ALL {
            assert_eq!(Capability::from_flag_name(cap.flag_name()), Some(cap));
        }
        assert_eq!(Capability::from_flag_name("r_widgets"), None);
    }

    #[test]
    fn test_deserialize_levels_and_bools() {
        let scope: AccessScope = serde_json::from_value(json!({
            "r_locations": 3,
            "r_nodes": 0,
            "r_servers": true,
            "r_users": 2,
            "r_eggs": 1
        }))
        .unwrap();

        assert!(scope.allows(Capability::Locations));
        assert!(!scope.allows(Capability::Nodes));
        assert!(scope.allows(Capability::Servers));
        assert!(!scope.allows(Capability::Users));
        assert!(scope.allows(Capability::Eggs));
        assert!(!scope.allows(Capability::Nests));
    }

    #[test]
    fn test_deserialize_string_flags() {
        let scope: AccessScope = serde_json::from_value(json!({
            "r_locations": "1",
            "r_nodes": "false"
        }))
        .unwrap();

        assert!(scope.allows(Capability::Locations));
        assert!(!scope.allows(Capability::Nodes));

        let invalid = serde_json::from_value::<AccessScope>(json!({ "r_nodes": "sometimes" }));
        assert!(invalid.is_err());
    }

    #[test]
    fn test_from_iterator() {
        let scope: AccessScope = [Capability::Locations, Capability::Servers].into_iter().collect();
        assert_eq!(scope.granted(), vec![Capability::Servers, Capability::Locations]);
    }
}
