//! `include` parameter parsing and resolution.

use tracing::debug;

use crate::models::{RelationshipSpec, ResourceKind};
use crate::rbac::{AccessScope, PermissionEvaluator};

/// A requested relationship and whether the caller may see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedInclude {
    pub spec: &'static RelationshipSpec,
    pub permitted: bool,
}

/// Split a raw `include` value into distinct relationship names.
///
/// Segments are trimmed and empty ones skipped. A dotted path such as
/// `servers.node` requests only its first segment; expansion stops one
/// level below the primary resource.
pub fn parse_include(raw: Option<&str>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for segment in raw.unwrap_or_default().split(',') {
        let name = segment.split('.').next().unwrap_or_default().trim();
        if !name.is_empty() && !names.iter().any(|existing| existing == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Intersect requested names with the declared relationships of `kind`.
///
/// The result follows declaration order, whatever order the caller used.
/// Names `kind` does not declare are dropped without error.
pub fn resolve_includes(requested: &[String], kind: ResourceKind, scope: &AccessScope) -> Vec<ResolvedInclude> {
    let evaluator = PermissionEvaluator::new(scope);

    for name in requested {
        if kind.relationship(name).is_none() {
            debug!(resource = %kind, include = %name, "Ignoring unsupported include");
        }
    }

    kind.relationships()
        .iter()
        .filter(|spec| requested.iter().any(|name| name == spec.name))
        .map(|spec| ResolvedInclude {
            spec,
            permitted: evaluator.can_access(spec),
        })
        .collect()
}
