use serde::Serialize;

use crate::error::Error;
use crate::statement::Statement;
use crate::window::WindowStrategy;

/// The count and windowed statements for one page of a base statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePlan {
    /// 1-based page number.
    pub page: u64,
    /// Page size.
    pub per_page: u64,
    /// Rows skipped before the page.
    pub skip: u64,
    /// Rows taken for the page.
    pub take: u64,
    /// Statement counting every row of the base statement.
    pub count_sql: String,
    /// Statement returning only the rows of the page.
    pub items_sql: String,
}

impl PagePlan {
    /// Plan page `page` (1-based) of `per_page` rows over `sql`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPage`] for a zero page number or page size, or
    /// when the offset overflows, and [`Error::MalformedStatement`] when `sql`
    /// cannot be rewritten.
    pub fn new(
        sql: &str, page: u64, per_page: u64, window: &dyn WindowStrategy,
    ) -> Result<Self, Error> {
        if page == 0 {
            return Err(Error::InvalidPage("pages are numbered from 1".to_string()));
        }
        if per_page == 0 {
            return Err(Error::InvalidPage("items per page must be at least 1".to_string()));
        }
        let skip = (page - 1)
            .checked_mul(per_page)
            .ok_or_else(|| Error::InvalidPage(format!("page {page} of {per_page} overflows")))?;

        let statement = Statement::parse(sql)?;
        let count_sql = statement.count_sql();
        let items_sql = window.window(&statement, skip, per_page)?;

        tracing::debug!(page, per_page, count_sql = %count_sql, items_sql = %items_sql, "planned page");

        Ok(Self {
            page,
            per_page,
            skip,
            take: per_page,
            count_sql,
            items_sql,
        })
    }
}

/// One page of results together with pagination statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    current_page: u64,
    items_per_page: u64,
    total_items: u64,
    total_pages: u64,
    items: Vec<T>,
}

impl<T> Page<T> {
    /// Assemble a page. `total_pages` is derived from the totals.
    #[must_use]
    pub const fn new(items: Vec<T>, current_page: u64, items_per_page: u64, total_items: u64) -> Self {
        let total_pages =
            if items_per_page == 0 { 0 } else { total_items.div_ceil(items_per_page) };
        Self {
            current_page,
            items_per_page,
            total_items,
            total_pages,
            items,
        }
    }

    /// Items of this page in row order.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// 1-based page number.
    #[must_use]
    pub const fn current_page(&self) -> u64 {
        self.current_page
    }

    /// Requested page size.
    #[must_use]
    pub const fn items_per_page(&self) -> u64 {
        self.items_per_page
    }

    /// Rows produced by the base statement.
    #[must_use]
    pub const fn total_items(&self) -> u64 {
        self.total_items
    }

    /// Number of pages needed to show every row; `0` when there are none.
    #[must_use]
    pub const fn total_pages(&self) -> u64 {
        self.total_pages
    }

    /// Consume the page, returning its items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{LimitOffset, OffsetFetch};

    #[test]
    fn second_page_of_five() {
        let plan = PagePlan::new("SELECT * FROM users ORDER BY user_id", 2, 5, &LimitOffset).unwrap();
        assert_eq!(plan.skip, 5);
        assert_eq!(plan.take, 5);
        assert_eq!(plan.count_sql, "SELECT COUNT(*) FROM users");
        assert_eq!(plan.items_sql, "SELECT * FROM users ORDER BY user_id LIMIT 5 OFFSET 5");

        let plan = PagePlan::new("SELECT * FROM users ORDER BY user_id", 3, 5, &OffsetFetch).unwrap();
        assert_eq!(
            plan.items_sql,
            "SELECT * FROM users ORDER BY user_id OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY"
        );
    }

    #[test]
    fn invalid_requests() {
        let zero_page = PagePlan::new("SELECT * FROM users", 0, 5, &LimitOffset).unwrap_err();
        assert!(matches!(zero_page, Error::InvalidPage(_)));

        let zero_size = PagePlan::new("SELECT * FROM users", 1, 0, &LimitOffset).unwrap_err();
        assert!(matches!(zero_size, Error::InvalidPage(_)));

        let overflow = PagePlan::new("SELECT * FROM users", u64::MAX, 2, &LimitOffset).unwrap_err();
        assert!(matches!(overflow, Error::InvalidPage(_)));

        let malformed = PagePlan::new("SELECT * FROM users LIMIT 1", 1, 5, &LimitOffset).unwrap_err();
        assert!(matches!(malformed, Error::MalformedStatement { .. }));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(Page::<()>::new(vec![], 1, 5, 15).total_pages(), 3);
        assert_eq!(Page::<()>::new(vec![], 1, 5, 16).total_pages(), 4);
        assert_eq!(Page::<()>::new(vec![], 1, 5, 1).total_pages(), 1);
        assert_eq!(Page::<()>::new(vec![], 1, 5, 0).total_pages(), 0);
    }

    #[test]
    fn serializes_statistics() {
        let page = Page::new(vec!["a", "b"], 2, 2, 5);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "currentPage": 2,
                "itemsPerPage": 2,
                "totalItems": 5,
                "totalPages": 3,
                "items": ["a", "b"],
            })
        );
    }
}
