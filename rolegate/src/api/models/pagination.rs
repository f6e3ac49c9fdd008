//! Shared pagination query parameters.

use serde::Deserialize;

use crate::db::handlers::ListFilter;

/// Default number of items to return per page.
pub const DEFAULT_LIMIT: i64 = 10;

/// Maximum number of items that can be requested per page.
pub const MAX_LIMIT: i64 = 100;

/// Offset pagination: `skip` defaults to 0, `limit` to 10 and is clamped to 1..=100.
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    #[inline]
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    #[inline]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

impl From<&Pagination> for ListFilter {
    fn from(pagination: &Pagination) -> Self {
        ListFilter::new(pagination.skip(), pagination.limit())
    }
}
