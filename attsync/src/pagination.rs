//! Page arithmetic for list endpoints

/// Default rows per page for check-in listings
pub const PAGE_SIZE: i64 = 100;
/// Largest page a client may ask for
pub const MAX_PAGE_SIZE: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET
    pub offset: i64,
}

/// Clamp the requested page into `[1, total_pages]` and derive the offset
///
/// ```
/// use attsync::pagination::calculate_pagination;
///
/// let p = calculate_pagination(250, 3, None);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 200);
///
/// let p = calculate_pagination(250, 99, Some(50));
/// assert_eq!(p.page, 5);
/// ```
pub fn calculate_pagination(total: i64, requested_page: i64, per_page: Option<i64>) -> Pagination {
    let per_page = per_page.unwrap_or(PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let total_pages = (total.max(0) + per_page - 1) / per_page;
    let page = requested_page.max(1).min(total_pages.max(1));

    Pagination {
        page,
        per_page,
        total_pages,
        offset: (page - 1) * per_page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_page() {
        let p = calculate_pagination(250, 2, None);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset, 100);
    }

    #[test]
    fn test_out_of_range_pages_are_clamped() {
        assert_eq!(calculate_pagination(150, 99, None).page, 2);
        assert_eq!(calculate_pagination(150, 0, None).page, 1);
        assert_eq!(calculate_pagination(150, -4, None).offset, 0);
    }

    #[test]
    fn test_empty_result() {
        let p = calculate_pagination(0, 1, None);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_per_page_bounds() {
        assert_eq!(calculate_pagination(10, 1, Some(0)).per_page, 1);
        assert_eq!(calculate_pagination(10, 1, Some(5000)).per_page, MAX_PAGE_SIZE);

        let p = calculate_pagination(200, 2, Some(100));
        assert_eq!(p.total_pages, 2);
        assert_eq!(p.offset, 100);
    }
}
