//! Application API: read-only locations, nodes and servers.
//!
//! Every endpoint checks the key's base read capability before touching
//! the repository, so a key without it gets 403 whether or not the record
//! exists.

pub mod locations;
pub mod nodes;
pub mod servers;

use axum::{routing::get, Router};
use tracing::debug;

use super::AppState;
use crate::db::ResourceRepository;
use crate::error::{PanelError, Result};
use crate::middleware::AuthContext;
use crate::models::ResourceKind;
use crate::pagination::{paginate, LinkBuilder, ListQuery, ListRequest, PaginatedList, QueryRules};
use crate::rbac::PermissionEvaluator;
use crate::telemetry::HandlerTimer;
use crate::transform::{Item, Resource, ResourceTransformer};

/// Build the `/api/application` router.
///
/// # Endpoints
///
/// - `GET /locations`, `GET /locations/:id`
/// - `GET /nodes`, `GET /nodes/:id`
/// - `GET /servers`, `GET /servers/:id`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/locations", get(locations::index))
        .route("/locations/:id", get(locations::view))
        .route("/nodes", get(nodes::index))
        .route("/nodes/:id", get(nodes::view))
        .route("/servers", get(servers::index))
        .route("/servers/:id", get(servers::view))
}

/// Parse a path identifier. Anything but a positive integer is a 404.
pub fn parse_id(kind: ResourceKind, raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| PanelError::not_found(kind.object_name(), raw))
}

async fn fetch_page(
    repository: &dyn ResourceRepository,
    kind: ResourceKind,
    request: &ListRequest,
) -> Result<(Vec<Resource>, u64)> {
    Ok(match kind {
        ResourceKind::Location => {
            let (records, total) = repository.list_locations(request).await?;
            (records.into_iter().map(Resource::from).collect(), total)
        }
        ResourceKind::Node => {
            let (records, total) = repository.list_nodes(request).await?;
            (records.into_iter().map(Resource::from).collect(), total)
        }
        ResourceKind::Server => {
            let (records, total) = repository.list_servers(request).await?;
            (records.into_iter().map(Resource::from).collect(), total)
        }
    })
}

async fn fetch_one(repository: &dyn ResourceRepository, kind: ResourceKind, id: i64) -> Result<Option<Resource>> {
    Ok(match kind {
        ResourceKind::Location => repository.find_location(id).await?.map(Resource::from),
        ResourceKind::Node => repository.find_node(id).await?.map(Resource::from),
        ResourceKind::Server => repository.find_server(id).await?.map(Resource::from),
    })
}

/// List flow: authorize, validate the query, fetch a page, transform.
pub(crate) async fn list_resources(
    state: &AppState,
    auth: &AuthContext,
    query: &ListQuery,
    path: &str,
    kind: ResourceKind,
    rules: &QueryRules,
) -> Result<PaginatedList<Item>> {
    PermissionEvaluator::new(&auth.scope).authorize_read(kind)?;

    let request = query.to_list_request(rules, state.api.default_per_page, state.api.max_per_page)?;
    let repository = state.repository.as_ref();
    let (records, total) = fetch_page(repository, kind, &request).await?;

    let transformer = ResourceTransformer::new(repository, kind, query.include.as_deref(), &auth.scope);
    let items = transformer.transform_all(&records).await?;

    let meta = request.pagination.metadata(total);
    debug!(
        resource = %kind,
        key = %auth.identifier,
        request_id = %auth.request_id,
        page = meta.page,
        total,
        "Listed resources"
    );

    Ok(paginate(items, &meta, &LinkBuilder::new(&state.public_url, path, query)))
}

/// View flow: authorize, resolve the id, transform with includes.
///
/// `raw_id` is `None` when the path segment could not be decoded; that is
/// a 404, reported only once the read scope has been checked.
pub(crate) async fn view_resource(
    state: &AppState,
    auth: &AuthContext,
    raw_id: Option<&str>,
    query: &ListQuery,
    kind: ResourceKind,
) -> Result<Item> {
    PermissionEvaluator::new(&auth.scope).authorize_read(kind)?;

    let raw_id = raw_id.ok_or_else(|| PanelError::not_found(kind.object_name(), "undecodable path"))?;
    let id = parse_id(kind, raw_id)?;
    let repository = state.repository.as_ref();
    let record = fetch_one(repository, kind, id)
        .await?
        .ok_or_else(|| PanelError::not_found(kind.object_name(), id))?;

    ResourceTransformer::new(repository, kind, query.include.as_deref(), &auth.scope)
        .transform_with_includes(&record)
        .await
}

/// Record handler duration and the status the result will render as.
pub(crate) fn observe<T>(timer: HandlerTimer, result: &Result<T>) {
    let status = match result {
        Ok(_) => 200,
        Err(error) => error.http_status().as_u16(),
    };
    timer.finish(status);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id(ResourceKind::Location, "12").unwrap(), 12);
        assert_eq!(parse_id(ResourceKind::Location, " 7 ").unwrap(), 7);

        for raw in ["nil", "0", "-3", "1.5", "", "99999999999999999999"] {
            let error = parse_id(ResourceKind::Location, raw).unwrap_err();
            assert_eq!(error.code(), ErrorCode::NotFound, "{raw:?}");
        }
    }
}
