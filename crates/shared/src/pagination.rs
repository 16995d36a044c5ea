//! Page/limit pagination utilities.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default page size for directory listings.
pub const DEFAULT_LIMIT: usize = 20;

/// Largest page size a caller may request.
pub const MAX_LIMIT: usize = 500;

/// Error type for pagination parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("Page must be at least 1")]
    InvalidPage,
    #[error("Limit must be between 1 and 500")]
    InvalidLimit,
}

/// A validated page request (1-based page number).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub limit: usize,
}

impl PageRequest {
    /// Builds a page request, falling back to defaults for missing values.
    pub fn new(page: Option<usize>, limit: Option<usize>) -> Result<Self, PageError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);

        if page == 0 {
            return Err(PageError::InvalidPage);
        }
        if limit == 0 || limit > MAX_LIMIT {
            return Err(PageError::InvalidLimit);
        }

        Ok(Self { page, limit })
    }

    /// Zero-based offset of the first item on this page, saturating at `usize::MAX`.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// One page of results together with the totals a client needs to navigate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

/// Number of pages needed to show `total` items, `limit` at a time.
pub fn total_pages(total: usize, limit: usize) -> usize {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(limit)
}

/// Slices an already sorted collection into the requested page.
///
/// Requesting a page past the end yields an empty item list while still
/// reporting the correct totals.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total = items.len();
    let items = items
        .into_iter()
        .skip(request.offset())
        .take(request.limit)
        .collect();

    Page {
        items,
        total,
        page: request.page,
        total_pages: total_pages(total, request.limit),
    }
}
