//! Pagination primitives shared by every listing.

use serde::Serialize;

use crate::error::{DomainError, DomainResult};

pub const DEFAULT_PER_PAGE: u64 = 10;
pub const MAX_PER_PAGE: u64 = 100;

/// A validated, 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    per_page: u64,
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64) -> DomainResult<Self> {
        if page == 0 {
            return Err(DomainError::validation("page must be at least 1"));
        }
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(DomainError::validation(format!(
                "limit must be between 1 and {MAX_PER_PAGE}"
            )));
        }
        // Offsets are bound as signed 64-bit integers by SQL backends.
        let fits = (page - 1)
            .checked_mul(per_page)
            .is_some_and(|offset| offset <= i64::MAX as u64);
        if !fits {
            return Err(DomainError::validation(format!(
                "page must be at most {}",
                Self::max_page(per_page)
            )));
        }
        Ok(Self { page, per_page })
    }

    /// Largest page whose offset is still representable for `per_page`.
    pub fn max_page(per_page: u64) -> u64 {
        i64::MAX as u64 / per_page + 1
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Zero-based row offset of the first item on this page.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// One page of rows plus the totals of the whole result set.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(request: PageRequest, total: u64, items: Vec<T>) -> Self {
        Self {
            page: request.page,
            per_page: request.per_page,
            total,
            total_pages: total.div_ceil(request.per_page),
            items,
        }
    }

    /// Rejects a page past the end of a non-empty result set.
    pub fn ensure_in_range(self) -> DomainResult<Self> {
        if self.total > 0 && self.page > self.total_pages {
            return Err(DomainError::validation(format!(
                "Page {} exceeds total pages {}.",
                self.page, self.total_pages
            )));
        }
        Ok(self)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        let items = self.items.into_iter().map(f).collect();
        Page {
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
            items,
        }
    }

    /// Same totals, different rows.
    pub fn with_items<U>(self, items: Vec<U>) -> Page<U> {
        Page {
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
            items,
        }
    }

    pub fn ids(&self, f: impl Fn(&T) -> i64) -> Vec<i64> {
        self.items.iter().map(f).collect()
    }
}
