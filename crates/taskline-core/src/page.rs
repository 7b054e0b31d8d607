//! Pagination types.
//!
//! Page numbers are 1-based. A request maps to a half-open backend row
//! window via `from = (page - 1) * size` and `to = from + size - 1`
//! (inclusive, PostgREST range convention).

use serde::{Deserialize, Serialize};

/// Lower bound for page size.
const MIN_SIZE: u32 = 1;
/// Upper bound for page size, matching the backend's listing endpoints.
const MAX_SIZE: u32 = 100;

/// A validated pagination request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    /// Build a request, clamping `page` to at least 1 and `size` into
    /// `1..=100`.
    #[must_use]
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page: page.max(1),
            size: size.clamp(MIN_SIZE, MAX_SIZE),
        }
    }

    /// 1-based page number.
    #[must_use]
    pub fn page(self) -> u32 {
        self.page
    }

    /// Items per page.
    #[must_use]
    pub fn size(self) -> u32 {
        self.size
    }

    /// First row index of the window (0-based).
    #[must_use]
    pub fn from(self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.size)
    }

    /// Last row index of the window (0-based, inclusive).
    #[must_use]
    pub fn to(self) -> u64 {
        self.from() + u64::from(self.size) - 1
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

/// One page of results plus the pre-pagination match count.
///
/// `page` and `size` echo the request that produced this page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Rows for the requested window, in query order.
    pub items: Vec<T>,
    /// Total rows matching the filters, before pagination.
    pub total: u64,
    /// 1-based page number from the request.
    pub page: u32,
    /// Page size from the request.
    pub size: u32,
}

impl<T> Page<T> {
    /// Assemble a page envelope from rows plus the echoed request.
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page(),
            size: request.size(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
