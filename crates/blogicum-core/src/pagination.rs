//! Page requests and pages of listing results.

use serde::Serialize;

/// Default number of posts per listing page.
pub const DEFAULT_PER_PAGE: u64 = 10;

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Parse a raw `?page=` value. Missing, non-numeric or zero means page 1.
    pub fn parse(raw: Option<&str>, per_page: u64) -> Self {
        let page = raw
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(1);
        Self::new(page, per_page)
    }

    /// The page actually served when there are `total_pages` pages: past-the-end clamps to the last.
    pub fn clamp(self, total_pages: u64) -> Self {
        Self {
            page: self.page.min(total_pages.max(1)),
            per_page: self.per_page,
        }
    }

    /// Number of items skipped before this page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1) * self.per_page
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(request.per_page).max(1);
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total_items,
            total_pages,
            has_previous: request.page > 1,
            has_next: request.page < total_pages,
        }
    }

    /// Cut a page out of an already filtered and ordered list.
    pub fn from_vec(all: Vec<T>, request: PageRequest) -> Self {
        let total_items = all.len() as u64;
        let request = request.clamp(total_items.div_ceil(request.per_page));
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.per_page as usize)
            .collect();
        Self::new(items, request, total_items)
    }
}
