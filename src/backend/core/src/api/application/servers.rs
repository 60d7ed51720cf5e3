//! `/api/application/servers`

use axum::{
    extract::{rejection::PathRejection, OriginalUri, Path, Query, State},
    Json,
};

use super::{list_resources, observe, view_resource};
use crate::api::AppState;
use crate::error::Result;
use crate::middleware::AuthContext;
use crate::models::ResourceKind;
use crate::pagination::{ListQuery, PaginatedList, QueryRules};
use crate::telemetry::ApiMetrics;
use crate::transform::Item;

const KIND: ResourceKind = ResourceKind::Server;

pub const RULES: QueryRules = QueryRules {
    filters: &["uuid", "name", "external_id", "description"],
    sorts: &["id", "uuid"],
};

pub async fn index(
    State(state): State<AppState>,
    auth: AuthContext,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedList<Item>>> {
    let timer = ApiMetrics::start(KIND.object_name(), "index");
    let result = list_resources(&state, &auth, &query, uri.path(), KIND, &RULES).await;
    observe(timer, &result);
    result.map(Json)
}

pub async fn view(
    State(state): State<AppState>,
    auth: AuthContext,
    id: std::result::Result<Path<String>, PathRejection>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Item>> {
    let timer = ApiMetrics::start(KIND.object_name(), "view");
    let id = id.as_ref().ok().map(|Path(id)| id.as_str());
    let result = view_resource(&state, &auth, id, &query, KIND).await;
    observe(timer, &result);
    result.map(Json)
}
