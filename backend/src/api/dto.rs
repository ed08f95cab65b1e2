//! Shared Data Transfer Objects (DTOs) for API handlers.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Pagination metadata for list responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
    /// Total number of items across all pages
    pub total: i64,
    /// Total number of pages
    pub total_pages: u32,
}

impl Pagination {
    pub fn new(page: u32, per_page: u32, total: i64) -> Self {
        let total_pages = if total <= 0 || per_page == 0 {
            0
        } else {
            u32::try_from((total + i64::from(per_page) - 1) / i64::from(per_page))
                .unwrap_or(u32::MAX)
        };

        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

/// Query parameters for paginated list requests. Page size is fixed server-side.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Requested page number (default: 1)
    pub page: Option<u32>,
}

impl PageQuery {
    /// Get the page number, defaulting to 1 and never below it.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_defaults_and_floor() {
        assert_eq!(PageQuery::default().page(), 1);
        assert_eq!(PageQuery { page: Some(0) }.page(), 1);
        assert_eq!(PageQuery { page: Some(4) }.page(), 4);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(Pagination::new(1, 25, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 25, 25).total_pages, 1);
        assert_eq!(Pagination::new(1, 25, 26).total_pages, 2);
        assert_eq!(Pagination::new(2, 25, 51).total_pages, 3);
    }

    #[test]
    fn test_pagination_serialization() {
        let json = serde_json::to_value(Pagination::new(2, 25, 30)).unwrap();
        assert_eq!(json["page"], 2);
        assert_eq!(json["per_page"], 25);
        assert_eq!(json["total"], 30);
        assert_eq!(json["total_pages"], 2);
    }
}
