//! PostgreSQL repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::{Page, ResourceRepository};
use crate::error::Result;
use crate::models::{FeatureLimits, Location, Node, Server, ServerLimits};
use crate::pagination::{Filter, ListRequest, Sort};

const LOCATION_COLUMNS: &str = "id, short, long, created_at, updated_at";

const NODE_COLUMNS: &str = "id, uuid, public, name, description, location_id, fqdn, scheme, \
     behind_proxy, maintenance_mode, memory, memory_overallocate, disk, disk_overallocate, \
     upload_size, daemon_listen, daemon_sftp, daemon_base, daemon_token_id, created_at, updated_at";

const SERVER_COLUMNS: &str = "s.id, s.external_id, s.uuid, s.name, s.description, s.status, \
     s.memory, s.swap, s.disk, s.io, s.cpu, s.threads, s.oom_disabled, s.database_limit, \
     s.allocation_limit, s.backup_limit, s.owner_id, s.node_id, s.allocation_id, s.nest_id, \
     s.egg_id, s.startup, s.image, s.installed, s.environment, s.created_at, s.updated_at";

/// Repository over the panel's existing `locations`, `nodes` and `servers`
/// tables. Server limits are stored flattened (`memory`, `swap`, ...,
/// `database_limit`) and `environment` is a JSONB object.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    /// Create a new connection pool.
    pub async fn connect(database_url: &str, max_connections: u32, min_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        info!(max_connections, min_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Count and fetch one page of `table`.
    ///
    /// Filter and sort fields come from the endpoint whitelists, so they are
    /// pushed as column names; values are always bound.
    async fn fetch_page<T>(&self, columns: &str, table: &str, request: &ListRequest) -> Result<Page<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {}", table));
        push_filters(&mut count, &request.filters);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM {}", columns, table));
        push_filters(&mut query, &request.filters);
        push_order(&mut query, &request.sorts);
        query
            .push(" LIMIT ")
            .push_bind(to_i64(request.pagination.limit()))
            .push(" OFFSET ")
            .push_bind(to_i64(request.pagination.offset()));

        let rows = query.build_query_as::<T>().fetch_all(&self.pool).await?;
        Ok((rows, u64::try_from(total).unwrap_or(0)))
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filters: &[Filter]) {
    for (index, filter) in filters.iter().enumerate() {
        query.push(if index == 0 { " WHERE " } else { " AND " });
        query
            .push(format!("CAST({} AS TEXT) ILIKE ", filter.field))
            .push_bind(format!("%{}%", escape_like(&filter.value)));
    }
}

fn push_order(query: &mut QueryBuilder<'_, Postgres>, sorts: &[Sort]) {
    query.push(" ORDER BY ");
    for sort in sorts {
        query.push(format!("{} {}, ", sort.field, sort.direction.as_sql()));
    }
    query.push("id ASC");
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// ═══════════════════════════════════════════════════════════════════════════════
// Server Rows
// ═══════════════════════════════════════════════════════════════════════════════

/// Flat `servers` row; limits are grouped on conversion.
#[derive(Debug, FromRow)]
struct ServerRow {
    id: i64,
    external_id: Option<String>,
    uuid: Uuid,
    name: String,
    description: String,
    status: Option<String>,
    memory: i64,
    swap: i64,
    disk: i64,
    io: i64,
    cpu: i64,
    threads: Option<String>,
    oom_disabled: bool,
    database_limit: i64,
    allocation_limit: i64,
    backup_limit: i64,
    owner_id: i64,
    node_id: i64,
    allocation_id: i64,
    nest_id: i64,
    egg_id: i64,
    startup: String,
    image: String,
    installed: bool,
    environment: Json<BTreeMap<String, String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ServerRow> for Server {
    fn from(row: ServerRow) -> Self {
        Self {
            id: row.id,
            external_id: row.external_id,
            uuid: row.uuid,
            name: row.name,
            description: row.description,
            status: row.status,
            limits: ServerLimits {
                memory: row.memory,
                swap: row.swap,
                disk: row.disk,
                io: row.io,
                cpu: row.cpu,
                threads: row.threads,
                oom_disabled: row.oom_disabled,
            },
            feature_limits: FeatureLimits {
                databases: row.database_limit,
                allocations: row.allocation_limit,
                backups: row.backup_limit,
            },
            owner_id: row.owner_id,
            node_id: row.node_id,
            allocation_id: row.allocation_id,
            nest_id: row.nest_id,
            egg_id: row.egg_id,
            startup: row.startup,
            image: row.image,
            installed: row.installed,
            environment: row.environment.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Repository Implementation
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl ResourceRepository for PgRepository {
    async fn list_locations(&self, request: &ListRequest) -> Result<Page<Location>> {
        self.fetch_page(LOCATION_COLUMNS, "locations", request).await
    }

    async fn find_location(&self, id: i64) -> Result<Option<Location>> {
        let row = sqlx::query_as::<_, Location>(&format!(
            "SELECT {} FROM locations WHERE id = $1",
            LOCATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn nodes_for_location(&self, location_id: i64) -> Result<Vec<Node>> {
        let rows = sqlx::query_as::<_, Node>(&format!(
            "SELECT {} FROM nodes WHERE location_id = $1 ORDER BY id",
            NODE_COLUMNS
        ))
        .bind(location_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn servers_for_location(&self, location_id: i64) -> Result<Vec<Server>> {
        let rows = sqlx::query_as::<_, ServerRow>(&format!(
            r#"
            SELECT {}
            FROM servers s
            JOIN nodes n ON n.id = s.node_id
            WHERE n.location_id = $1
            ORDER BY s.id
            "#,
            SERVER_COLUMNS
        ))
        .bind(location_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Server::from).collect())
    }

    async fn list_nodes(&self, request: &ListRequest) -> Result<Page<Node>> {
        self.fetch_page(NODE_COLUMNS, "nodes", request).await
    }

    async fn find_node(&self, id: i64) -> Result<Option<Node>> {
        let row = sqlx::query_as::<_, Node>(&format!("SELECT {} FROM nodes WHERE id = $1", NODE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn servers_for_node(&self, node_id: i64) -> Result<Vec<Server>> {
        let rows = sqlx::query_as::<_, ServerRow>(&format!(
            "SELECT {} FROM servers s WHERE s.node_id = $1 ORDER BY s.id",
            SERVER_COLUMNS
        ))
        .bind(node_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Server::from).collect())
    }

    async fn list_servers(&self, request: &ListRequest) -> Result<Page<Server>> {
        let (rows, total) = self
            .fetch_page::<ServerRow>(SERVER_COLUMNS, "servers s", request)
            .await?;
        Ok((rows.into_iter().map(Server::from).collect(), total))
    }

    async fn find_server(&self, id: i64) -> Result<Option<Server>> {
        let row = sqlx::query_as::<_, ServerRow>(&format!(
            "SELECT {} FROM servers s WHERE s.id = $1",
            SERVER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Server::from))
    }

    async fn location_for_server(&self, server_id: i64) -> Result<Option<Location>> {
        let row = sqlx::query_as::<_, Location>(
            r#"
            SELECT l.id, l.short, l.long, l.created_at, l.updated_at
            FROM locations l
            JOIN nodes n ON n.location_id = l.id
            JOIN servers s ON s.node_id = n.id
            WHERE s.id = $1
            "#,
        )
        .bind(server_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::SortDirection;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_list_query_sql() {
        let request = ListRequest::page(3, 5)
            .with_filter("short", "us")
            .with_filter("long", "york")
            .with_sort("id", SortDirection::Desc);

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM locations");
        push_filters(&mut query, &request.filters);
        push_order(&mut query, &request.sorts);

        assert_eq!(
            query.sql(),
            "SELECT * FROM locations WHERE CAST(short AS TEXT) ILIKE $1 AND CAST(long AS TEXT) ILIKE $2 \
             ORDER BY id DESC, id ASC"
        );
    }
}
