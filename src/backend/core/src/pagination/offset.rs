//! Offset-based pagination.
//!
//! - Page/per_page parameter handling
//! - Total count tracking
//! - Page metadata computation
//! - OFFSET/LIMIT values for repositories

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// Page Metadata
// ═══════════════════════════════════════════════════════════════════════════════

/// Metadata about a paginated result set.
///
/// The requested page is kept as-is, even past the last page, so callers
/// see `current_page` echo what they asked for alongside an empty page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    /// Current page number (1-indexed).
    pub page: u64,
    /// Number of items per page.
    pub per_page: u64,
    /// Total number of items across all pages.
    pub total_items: u64,
    /// `ceil(total_items / per_page)`; zero for an empty result set.
    pub total_pages: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PageMetadata {
    /// Create page metadata from pagination parameters and total count.
    pub fn new(page: u64, per_page: u64, total_items: u64) -> Self {
        let per_page = per_page.max(1);
        let page = page.max(super::MIN_PAGE_NUMBER);
        let total_pages = total_items.div_ceil(per_page);

        Self {
            page,
            per_page,
            total_items,
            total_pages,
            has_previous: page > 1,
            has_next: page < total_pages,
        }
    }

    /// Number of items that belong on this page.
    pub fn items_on_page(&self) -> u64 {
        let start = (self.page - 1).saturating_mul(self.per_page);
        self.total_items.saturating_sub(start).min(self.per_page)
    }

    /// Get the previous page number if available.
    pub fn previous_page(&self) -> Option<u64> {
        self.has_previous.then(|| self.page - 1)
    }

    /// Get the next page number if available.
    pub fn next_page(&self) -> Option<u64> {
        self.has_next.then(|| self.page + 1)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Offset Pagination
// ═══════════════════════════════════════════════════════════════════════════════

/// Offset-based pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetPagination {
    /// Current page number (1-indexed).
    pub page: u64,
    /// Number of items per page.
    pub per_page: u64,
}

impl OffsetPagination {
    /// Create pagination clamped to the default bounds.
    pub fn new(page: u64, per_page: u64) -> Self {
        Self::bounded(page, per_page, super::MAX_PAGE_SIZE)
    }

    /// Create pagination with `per_page` clamped to `[1, max_per_page]`.
    pub fn bounded(page: u64, per_page: u64, max_per_page: u64) -> Self {
        Self {
            page: page.max(super::MIN_PAGE_NUMBER),
            per_page: per_page.clamp(1, max_per_page.max(1)),
        }
    }

    /// Get the OFFSET value.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Get the LIMIT value.
    pub fn limit(&self) -> u64 {
        self.per_page
    }

    /// Create page metadata from a total count.
    pub fn metadata(&self, total_items: u64) -> PageMetadata {
        PageMetadata::new(self.page, self.per_page, total_items)
    }

    /// Apply pagination to an iterator.
    pub fn paginate_iter<T, I: Iterator<Item = T>>(&self, iter: I) -> Vec<T> {
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit()).unwrap_or(usize::MAX);
        iter.skip(offset).take(limit).collect()
    }
}

impl Default for OffsetPagination {
    fn default() -> Self {
        Self {
            page: super::MIN_PAGE_NUMBER,
            per_page: super::DEFAULT_PAGE_SIZE,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
