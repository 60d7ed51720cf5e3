//! Pagination utilities.
//!
//! - Offset-based pagination with page metadata
//! - Query parameter parsing (`page`, `per_page`, `include`, `sort`, `filter[...]`)
//! - The paginated list envelope with `meta.pagination`
//!
//! # Usage
//!
//! ```rust,ignore
//! use panel_core::pagination::{paginate, LinkBuilder, ListQuery};
//!
//! let request = query.to_list_request(&RULES, 10, 100)?;
//! let (items, total) = repository.list_locations(&request).await?;
//! let meta = request.pagination.metadata(total);
//! let list = paginate(items, &meta, &LinkBuilder::new(public_url, path, &query));
//! ```

mod offset;
mod query;
mod response;

pub use offset::{OffsetPagination, PageMetadata};
pub use query::{Filter, ListQuery, ListRequest, QueryRules, Sort, SortDirection};
pub use response::{
    paginate, LinkBuilder, ListMeta, PaginatedList, PaginationLinks, PaginationMeta, LIST_OBJECT,
};

/// Default page size if not specified.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Maximum allowed page size.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Minimum page number (1-indexed).
pub const MIN_PAGE_NUMBER: u64 = 1;
