use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A physical or logical grouping of nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Location {
    pub id: i64,
    /// Short unique code, e.g. `us.nyc.lvl3`
    pub short: String,
    /// Free-form description
    pub long: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    pub fn new(id: i64, short: impl Into<String>, long: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            short: short.into(),
            long,
            created_at: now,
            updated_at: now,
        }
    }
}
