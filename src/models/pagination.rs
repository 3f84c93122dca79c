//! Page-number pagination shared by every list view

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

/// `?page=N` query parameter (1-based)
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page number (default: 1)
    pub page: Option<i64>,
}

/// A requested page with a fixed page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    pub fn new(query: PageQuery, per_page: i64) -> Self {
        Self {
            page: query.page.unwrap_or(1),
            per_page,
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    /// Number of pages for `total` records. An empty set still has one page.
    pub fn num_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            1
        } else {
            (total + self.per_page - 1) / self.per_page
        }
    }

    /// Reject page numbers outside `1..=num_pages`
    pub fn check(&self, total: i64) -> AppResult<()> {
        if self.page < 1 || self.page > self.num_pages(total) {
            return Err(AppError::NotFound(format!("Invalid page ({})", self.page)));
        }
        Ok(())
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize, ToSchema)]
pub struct Page<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Records on this page
    pub items: Vec<T>,
    /// Total number of records
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Records per page
    pub per_page: i64,
    /// Number of pages
    pub num_pages: i64,
    /// Whether the set spans more than one page
    pub is_paginated: bool,
}

impl<T> Page<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        let num_pages = pagination.num_pages(total);
        Self {
            items,
            total,
            page: pagination.page,
            per_page: pagination.per_page,
            num_pages,
            is_paginated: num_pages > 1,
        }
    }

    /// Convert the records, keeping the paging metadata
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        U: for<'a> ToSchema<'a>,
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            num_pages: self.num_pages,
            is_paginated: self.is_paginated,
        }
    }
}
