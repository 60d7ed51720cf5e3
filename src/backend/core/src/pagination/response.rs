//! Paginated list envelopes.
//!
//! A top-level listing renders as:
//!
//! ```json
//! {
//!   "object": "list",
//!   "data": [...],
//!   "meta": {
//!     "pagination": {
//!       "total": 2, "count": 2, "per_page": 10,
//!       "current_page": 1, "total_pages": 1, "links": []
//!     }
//!   }
//! }
//! ```

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use url::Url;

use super::offset::PageMetadata;
use super::query::ListQuery;

/// Object tag of every list envelope.
pub const LIST_OBJECT: &str = "list";

// ═══════════════════════════════════════════════════════════════════════════════
// Links
// ═══════════════════════════════════════════════════════════════════════════════

/// Absolute URLs of the neighbouring pages.
///
/// Serializes as `[]` when there are no neighbours and as an object with
/// only the present keys otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationLinks {
    pub previous: Option<String>,
    pub next: Option<String>,
}

impl PaginationLinks {
    pub fn is_empty(&self) -> bool {
        self.previous.is_none() && self.next.is_none()
    }
}

impl Serialize for PaginationLinks {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_empty() {
            return serializer.serialize_seq(Some(0))?.end();
        }

        let len = usize::from(self.previous.is_some()) + usize::from(self.next.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        if let Some(previous) = &self.previous {
            map.serialize_entry("previous", previous)?;
        }
        if let Some(next) = &self.next {
            map.serialize_entry("next", next)?;
        }
        map.end()
    }
}

/// Builds page URLs that preserve the caller's query parameters.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    endpoint: String,
    params: Vec<(String, String)>,
}

impl LinkBuilder {
    /// `public_url` is the externally visible base, `path` the request path.
    pub fn new(public_url: &str, path: &str, query: &ListQuery) -> Self {
        let mut params = Vec::new();
        if let Some(per_page) = &query.per_page {
            params.push(("per_page".to_string(), per_page.clone()));
        }
        if let Some(include) = &query.include {
            params.push(("include".to_string(), include.clone()));
        }
        if let Some(sort) = &query.sort {
            params.push(("sort".to_string(), sort.clone()));
        }
        for (field, value) in &query.filters {
            params.push((format!("filter[{}]", field), value.clone()));
        }

        Self {
            endpoint: format!("{}{}", public_url.trim_end_matches('/'), path),
            params,
        }
    }

    /// URL of `page`, or `None` when the configured base is not a valid URL.
    pub fn page_url(&self, page: u64) -> Option<String> {
        let mut url = Url::parse(&self.endpoint).ok()?;
        url.query_pairs_mut()
            .clear()
            .extend_pairs(self.params.iter())
            .append_pair("page", &page.to_string());
        Some(url.into())
    }

    pub fn links(&self, meta: &PageMetadata) -> PaginationLinks {
        PaginationLinks {
            previous: meta.previous_page().and_then(|page| self.page_url(page)),
            next: meta.next_page().and_then(|page| self.page_url(page)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Pagination Meta
// ═══════════════════════════════════════════════════════════════════════════════

/// The `meta.pagination` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    pub total: u64,
    pub count: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub total_pages: u64,
    pub links: PaginationLinks,
}

impl PaginationMeta {
    pub fn new(meta: &PageMetadata, count: u64, links: PaginationLinks) -> Self {
        Self {
            total: meta.total_items,
            count,
            per_page: meta.per_page,
            current_page: meta.page,
            total_pages: meta.total_pages,
            links,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListMeta {
    pub pagination: PaginationMeta,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Paginated List
// ═══════════════════════════════════════════════════════════════════════════════

/// A top-level paginated list envelope.
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedList<T> {
    pub object: &'static str,
    pub data: Vec<T>,
    pub meta: ListMeta,
}

impl<T> PaginatedList<T> {
    pub fn pagination(&self) -> &PaginationMeta {
        &self.meta.pagination
    }
}

/// Wrap one page of items with its pagination metadata.
///
/// `count` is the number of items actually on the page.
pub fn paginate<T>(items: Vec<T>, meta: &PageMetadata, links: &LinkBuilder) -> PaginatedList<T> {
    let count = items.len() as u64;
    PaginatedList {
        object: LIST_OBJECT,
        meta: ListMeta {
            pagination: PaginationMeta::new(meta, count, links.links(meta)),
        },
        data: items,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn builder(pairs: &[(&str, &str)]) -> LinkBuilder {
        let query = ListQuery::from(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Vec<_>>(),
        );
        LinkBuilder::new("https://panel.example.com/", "/api/application/locations", &query)
    }

    #[test]
    fn test_empty_links_serialize_as_array() {
        let links = PaginationLinks::default();
        assert_eq!(serde_json::to_value(&links).unwrap(), json!([]));
    }

    #[test]
    fn test_links_serialize_present_keys_only() {
        let links = PaginationLinks {
            previous: None,
            next: Some("https://panel.example.com/x?page=2".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&links).unwrap(),
            json!({ "next": "https://panel.example.com/x?page=2" })
        );
    }

    #[test]
    fn test_page_url_preserves_params() {
        let url = builder(&[("per_page", "1"), ("include", "nodes,servers")])
            .page_url(2)
            .unwrap();

        assert_eq!(
            url,
            "https://panel.example.com/api/application/locations?per_page=1&include=nodes%2Cservers&page=2"
        );
    }

    #[test]
    fn test_invalid_base_yields_no_links() {
        let query = ListQuery::default();
        let links = LinkBuilder::new("not a url", "/x", &query);
        assert_eq!(links.page_url(2), None);
    }

    #[test]
    fn test_paginate_single_page() {
        let meta = PageMetadata::new(1, 10, 2);
        let list = paginate(vec!["a", "b"], &meta, &builder(&[]));

        assert_eq!(
            serde_json::to_value(&list).unwrap(),
            json!({
                "object": "list",
                "data": ["a", "b"],
                "meta": {
                    "pagination": {
                        "total": 2,
                        "count": 2,
                        "per_page": 10,
                        "current_page": 1,
                        "total_pages": 1,
                        "links": []
                    }
                }
            })
        );
    }

    #[test]
    fn test_paginate_middle_page_links() {
        let meta = PageMetadata::new(2, 1, 3);
        let list = paginate(vec!["b"], &meta, &builder(&[("per_page", "1")]));
        let links = &list.pagination().links;

        assert_eq!(
            links.previous.as_deref(),
            Some("https://panel.example.com/api/application/locations?per_page=1&page=1")
        );
        assert_eq!(
            links.next.as_deref(),
            Some("https://panel.example.com/api/application/locations?per_page=1&page=3")
        );
        assert_eq!(list.pagination().count, 1);
        assert_eq!(list.pagination().total_pages, 3);
    }
}
