use serde::Deserialize;
use utoipa::ToSchema;

use crate::models::OrderStatus;

const DEFAULT_PER_PAGE: i64 = 20;
const MAX_PER_PAGE: i64 = 100;

/// Resolved paging window: 1-based page, page size and row offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
    pub offset: i64,
}

impl Page {
    pub fn resolve(page: Option<i64>, per_page: Option<i64>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        Self {
            page,
            per_page,
            offset: (page - 1) * per_page,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

// Fields stay flat: serde_urlencoded cannot feed numbers through `#[serde(flatten)]`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Filter by lifecycle status, e.g. `shipped`.
    pub status: Option<OrderStatus>,
    /// Newest first unless `asc`.
    pub sort_order: Option<SortOrder>,
}

impl OrderListQuery {
    pub fn page(&self) -> Page {
        Page::resolve(self.page, self.per_page)
    }
}
