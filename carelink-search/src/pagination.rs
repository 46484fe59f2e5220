//! Pagination utilities for provider listings

/// Default providers per page when the config does not say otherwise
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Total number of pages
    pub total_pages: i64,
    /// Index of the first item on this page
    pub offset: i64,
    /// Items per page
    pub page_size: i64,
}

impl Pagination {
    /// Slice of `items` belonging to this page
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.offset.max(0) as usize).min(items.len());
        let end = start.saturating_add(self.page_size.max(0) as usize).min(items.len());
        &items[start..end]
    }
}

/// Calculate pagination metadata from total results and requested page
///
/// The page is clamped to `[1, total_pages]`; a non-positive page size falls
/// back to [`DEFAULT_PAGE_SIZE`].
///
/// # Examples
/// ```
/// use carelink_search::pagination::calculate_pagination;
///
/// // 45 results at 20 per page = 3 pages (20 + 20 + 5)
/// let p = calculate_pagination(45, 2, 20);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 20);
///
/// // Requesting out-of-bounds page gets clamped
/// let p = calculate_pagination(45, 99, 20);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 40);
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64, page_size: i64) -> Pagination {
    let page_size = if page_size > 0 { page_size } else { DEFAULT_PAGE_SIZE };
    let total_pages = (total_results + page_size - 1) / page_size;
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * page_size;

    Pagination {
        page,
        total_pages,
        offset,
        page_size,
    }
}
