//! Pagination query parameters shared by every list endpoint.
//!
//! Values are passed through unclamped: out-of-range windows are rejected
//! with a validation error by [`PageRequest`](crate::db::models::page::PageRequest).

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

use crate::db::models::page::{DEFAULT_LIMIT, Page};

/// `limit`/`offset` query parameters.
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct Pagination {
    /// Maximum number of items to return (default: 20, range 1..=100)
    #[param(default = 20, minimum = 1, maximum = 100)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub limit: Option<i64>,

    /// Number of items to skip (default: 0)
    #[param(default = 0, minimum = 0)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub offset: Option<i64>,
}

impl Pagination {
    #[inline]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    #[inline]
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0)
    }
}

/// A page of items plus the total number available.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListResponse<T: ToSchema> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T: ToSchema> ListResponse<T> {
    /// Convert a storage page, mapping each row to its DTO.
    pub fn from_page<R>(page: Page<R>) -> Self
    where
        T: From<R>,
    {
        Self {
            items: page.items.into_iter().map(T::from).collect(),
            total: page.total,
        }
    }
}
