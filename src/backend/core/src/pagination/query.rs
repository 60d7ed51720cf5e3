//! Query parameter parsing for list and view endpoints.
//!
//! Recognised parameters: `page`, `per_page`, `include`, `sort` and
//! `filter[<field>]`. Anything else is ignored.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::offset::OffsetPagination;
use crate::error::{ErrorCode, PanelError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// Repository Query Vocabulary
// ═══════════════════════════════════════════════════════════════════════════════

/// Case-insensitive substring match on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: &'static str,
    pub direction: SortDirection,
}

/// Everything a repository needs to produce one page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListRequest {
    pub filters: Vec<Filter>,
    /// Applied in order; ties fall back to ascending id
    pub sorts: Vec<Sort>,
    pub pagination: OffsetPagination,
}

impl ListRequest {
    pub fn page(page: u64, per_page: u64) -> Self {
        Self {
            pagination: OffsetPagination::new(page, per_page),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, field: &'static str, value: impl Into<String>) -> Self {
        self.filters.push(Filter {
            field,
            value: value.into(),
        });
        self
    }

    pub fn with_sort(mut self, field: &'static str, direction: SortDirection) -> Self {
        self.sorts.push(Sort { field, direction });
        self
    }
}

/// Filters and sorts a listing endpoint accepts.
#[derive(Debug, Clone, Copy)]
pub struct QueryRules {
    pub filters: &'static [&'static str],
    pub sorts: &'static [&'static str],
}

// ═══════════════════════════════════════════════════════════════════════════════
// Raw Query
// ═══════════════════════════════════════════════════════════════════════════════

/// Raw query string parameters, as received.
///
/// Values stay strings until validated so a malformed `page` produces a
/// validation error body rather than an extractor rejection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<(String, String)>")]
pub struct ListQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub include: Option<String>,
    pub sort: Option<String>,
    /// `filter[<field>]` values keyed by field
    pub filters: BTreeMap<String, String>,
}

impl From<Vec<(String, String)>> for ListQuery {
    fn from(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "page" => query.page = Some(value),
                "per_page" => query.per_page = Some(value),
                "include" => query.include = Some(value),
                "sort" => query.sort = Some(value),
                _ => {
                    if let Some(field) = key
                        .strip_prefix("filter[")
                        .and_then(|rest| rest.strip_suffix(']'))
                    {
                        query.filters.insert(field.to_string(), value);
                    }
                }
            }
        }
        query
    }
}

impl ListQuery {
    /// Validate `page` / `per_page` and clamp them into range.
    pub fn pagination(&self, default_per_page: u64, max_per_page: u64) -> Result<OffsetPagination> {
        let page = parse_integer("page", self.page.as_deref())?.map_or(1, at_least_one);
        let per_page = parse_integer("per_page", self.per_page.as_deref())?
            .map_or(default_per_page, at_least_one);

        Ok(OffsetPagination::bounded(page, per_page, max_per_page))
    }

    /// Resolve `filter[...]` parameters against the allowed fields.
    pub fn filters(&self, allowed: &'static [&'static str]) -> Result<Vec<Filter>> {
        let unknown: Vec<&str> = self
            .filters
            .keys()
            .map(String::as_str)
            .filter(|field| !allowed.iter().any(|candidate| candidate == field))
            .collect();

        if !unknown.is_empty() {
            return Err(PanelError::new(
                ErrorCode::InvalidFilterQuery,
                format!(
                    "Requested filter(s) `{}` are not allowed. Allowed filter(s) are `{}`.",
                    unknown.join(", "),
                    allowed.join(", ")
                ),
            ));
        }

        Ok(self
            .filters
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .filter_map(|(name, value)| {
                allowed
                    .iter()
                    .copied()
                    .find(|candidate| candidate == name)
                    .map(|field| Filter {
                        field,
                        value: value.trim().to_string(),
                    })
            })
            .collect())
    }

    /// Resolve `sort=field,-other` against the allowed fields.
    pub fn sorts(&self, allowed: &'static [&'static str]) -> Result<Vec<Sort>> {
        let Some(raw) = self.sort.as_deref() else {
            return Ok(Vec::new());
        };

        let mut sorts = Vec::new();
        for segment in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (name, direction) = match segment.strip_prefix('-') {
                Some(name) => (name, SortDirection::Desc),
                None => (segment, SortDirection::Asc),
            };

            let field = allowed.iter().copied().find(|candidate| *candidate == name).ok_or_else(|| {
                PanelError::new(
                    ErrorCode::InvalidSortQuery,
                    format!(
                        "Requested sort(s) `{}` is not allowed. Allowed sort(s) are `{}`.",
                        name,
                        allowed.join(", ")
                    ),
                )
            })?;

            sorts.push(Sort { field, direction });
        }

        Ok(sorts)
    }

    /// Build the full repository request for a listing endpoint.
    pub fn to_list_request(
        &self,
        rules: &QueryRules,
        default_per_page: u64,
        max_per_page: u64,
    ) -> Result<ListRequest> {
        Ok(ListRequest {
            filters: self.filters(rules.filters)?,
            sorts: self.sorts(rules.sorts)?,
            pagination: self.pagination(default_per_page, max_per_page)?,
        })
    }
}

fn at_least_one(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0).max(1)
}

fn parse_integer(field: &'static str, raw: Option<&str>) -> Result<Option<i64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<i64>().map(Some).map_err(|_| {
            PanelError::validation(
                field,
                "integer",
                format!("The {} must be an integer.", field.replace('_', " ")),
            )
        }),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
