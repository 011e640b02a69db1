//! Query execution facade.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::instrument;

use crate::error::Error;
use crate::mapper::Mapper;
use crate::materialize::PocoSet;
use crate::options::MapperOptions;
use crate::paging::{Page, PagePlan};
use crate::poco::Poco;
use crate::statement::Statement;
use crate::window::{LimitOffset, WindowStrategy};
use crate::{Connection, DataType, Row};

/// Runs statements through a [`Connection`] and maps the results.
///
/// Cloning is cheap: clones share the connection and the plan cache.
///
/// # Examples
///
/// ```ignore
/// let db = Database::new(SqlDefault::connect().await?);
///
/// let page: Page<User> =
///     db.page(2, 5, "SELECT * FROM users WHERE age > ?1 ORDER BY name", params![18]?).await?;
/// assert_eq!(page.total_pages(), 3);
/// ```
#[derive(Clone)]
pub struct Database {
    conn: Arc<dyn Connection>,
    mapper: Mapper,
    window: Arc<dyn WindowStrategy>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("conn", &self.conn)
            .field("mapper", &self.mapper)
            .field("window", &self.window)
            .finish()
    }
}

impl Database {
    /// Wraps `conn` with default mapper options and [`LimitOffset`] windowing.
    #[must_use]
    pub fn new(conn: impl Connection) -> Self {
        Self::with_options(conn, &MapperOptions::default())
    }

    /// Wraps `conn` with the given mapper options.
    #[must_use]
    pub fn with_options(conn: impl Connection, options: &MapperOptions) -> Self {
        Self {
            conn: Arc::new(conn),
            mapper: Mapper::new(options),
            window: Arc::new(LimitOffset),
        }
    }

    /// Replaces the windowing strategy used for paging.
    #[must_use]
    pub fn window_strategy(mut self, window: impl WindowStrategy + 'static) -> Self {
        self.window = Arc::new(window);
        self
    }

    /// The mapper, and with it the plan cache, used by this database.
    #[must_use]
    pub const fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    /// Execute `sql` and map every row onto `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if execution fails, the columns cannot be resolved or
    /// a value cannot be converted.
    #[instrument(skip(self, params))]
    pub async fn fetch<T: Poco>(&self, sql: &str, params: Vec<DataType>) -> Result<Vec<T>> {
        let rows = self.query(sql.to_string(), params).await?;
        self.mapper.map_rows(&rows)
    }

    /// Execute `sql` and map every row onto each type of the tuple `S`.
    ///
    /// ```ignore
    /// let pairs: Vec<(User, ExtraUserInfo)> = db.fetch_joined(sql, params![]?).await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if execution fails or any type cannot be mapped.
    #[instrument(skip(self, params))]
    pub async fn fetch_joined<S: PocoSet>(&self, sql: &str, params: Vec<DataType>) -> Result<Vec<S>> {
        let rows = self.query(sql.to_string(), params).await?;
        S::map_joined(&self.mapper, &rows)
    }

    /// Execute a batch returning several result sets, mapping set N onto
    /// type N of the tuple `S`.
    ///
    /// ```ignore
    /// let (users, infos) = db
    ///     .fetch_multiple::<(User, ExtraUserInfo)>(
    ///         "SELECT * FROM users; SELECT * FROM extra_user_infos",
    ///         params![]?,
    ///     )
    ///     .await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if execution fails or any type cannot be mapped.
    #[instrument(skip(self, params))]
    pub async fn fetch_multiple<S: PocoSet>(
        &self, sql: &str, params: Vec<DataType>,
    ) -> Result<S::Lists> {
        let sets = self
            .conn
            .query_multiple(sql.to_string(), params)
            .await
            .context("batch query failed")?;
        tracing::debug!(sets = sets.len(), "fetched result sets");
        S::map_sets(&self.mapper, sets)
    }

    /// Execute `sql`, which must return exactly one row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowCount`] unless exactly one row is returned.
    #[instrument(skip(self, params))]
    pub async fn single<T: Poco>(&self, sql: &str, params: Vec<DataType>) -> Result<T> {
        let rows = self.query(sql.to_string(), params).await?;
        match rows.as_slice() {
            [row] => self.mapper.map_row(row),
            _ => Err(row_count("exactly one row", rows.len())),
        }
    }

    /// Execute `sql`, which must return at most one row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowCount`] if more than one row is returned.
    #[instrument(skip(self, params))]
    pub async fn single_or_default<T: Poco>(
        &self, sql: &str, params: Vec<DataType>,
    ) -> Result<Option<T>> {
        let rows = self.query(sql.to_string(), params).await?;
        match rows.as_slice() {
            [] => Ok(None),
            [row] => self.mapper.map_row(row).map(Some),
            _ => Err(row_count("at most one row", rows.len())),
        }
    }

    /// Execute `sql` and map its first row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowCount`] if no row is returned.
    #[instrument(skip(self, params))]
    pub async fn first<T: Poco>(&self, sql: &str, params: Vec<DataType>) -> Result<T> {
        self.first_or_default(sql, params)
            .await?
            .ok_or_else(|| row_count("at least one row", 0))
    }

    /// Execute `sql` and map its first row, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if execution or mapping fails.
    #[instrument(skip(self, params))]
    pub async fn first_or_default<T: Poco>(
        &self, sql: &str, params: Vec<DataType>,
    ) -> Result<Option<T>> {
        let rows = self.query(sql.to_string(), params).await?;
        rows.first().map(|row| self.mapper.map_row(row)).transpose()
    }

    /// Fetch page `page` (1-based) of `per_page` items from `sql`, with totals.
    ///
    /// The count runs first; pages past the end return no items.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPage`] or [`Error::MalformedStatement`] before
    /// anything executes, or an execution or mapping error.
    #[instrument(skip(self, params))]
    pub async fn page<T: Poco>(
        &self, page: u64, per_page: u64, sql: &str, params: Vec<DataType>,
    ) -> Result<Page<T>> {
        let plan = PagePlan::new(sql, page, per_page, self.window.as_ref())?;

        let total = self
            .conn
            .scalar(plan.count_sql, params.clone())
            .await
            .context("count query failed")?;
        let total = u64::try_from(total).context("count query returned a negative total")?;

        let items = if plan.skip < total {
            let rows = self.query(plan.items_sql, params).await?;
            self.mapper.map_rows(&rows)?
        } else {
            Vec::new()
        };

        tracing::debug!(page, per_page, total, returned = items.len(), "fetched page");
        Ok(Page::new(items, page, per_page, total))
    }

    /// Fetch page `page` (1-based) of `per_page` items without counting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPage`] or [`Error::MalformedStatement`] before
    /// anything executes, or an execution or mapping error.
    #[instrument(skip(self, params))]
    pub async fn fetch_page<T: Poco>(
        &self, page: u64, per_page: u64, sql: &str, params: Vec<DataType>,
    ) -> Result<Vec<T>> {
        let plan = PagePlan::new(sql, page, per_page, self.window.as_ref())?;
        let rows = self.query(plan.items_sql, params).await?;
        self.mapper.map_rows(&rows)
    }

    /// Skip `skip` rows of `sql` and map the next `take`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedStatement`] before anything executes, or an
    /// execution or mapping error.
    #[instrument(skip(self, params))]
    pub async fn skip_take<T: Poco>(
        &self, skip: u64, take: u64, sql: &str, params: Vec<DataType>,
    ) -> Result<Vec<T>> {
        let statement = Statement::parse(sql)?;
        let windowed = self.window.window(&statement, skip, take)?;
        let rows = self.query(windowed, params).await?;
        self.mapper.map_rows(&rows)
    }

    /// Execute `sql` and return the first column of the first row.
    ///
    /// # Errors
    ///
    /// Returns an error if execution fails or the value is not an integer.
    #[instrument(skip(self, params))]
    pub async fn execute_scalar(&self, sql: &str, params: Vec<DataType>) -> Result<i64> {
        self.conn.scalar(sql.to_string(), params).await.context("scalar query failed")
    }

    /// Execute a statement that returns no rows, returning the number of rows
    /// affected.
    ///
    /// # Errors
    ///
    /// Returns an error if execution fails.
    #[instrument(skip(self, params))]
    pub async fn execute(&self, sql: &str, params: Vec<DataType>) -> Result<u32> {
        self.conn.exec(sql.to_string(), params).await.context("statement failed")
    }

    async fn query(&self, sql: String, params: Vec<DataType>) -> Result<Vec<Row>> {
        let rows = self.conn.query(sql, params).await.context("query failed")?;
        tracing::debug!(rows = rows.len(), "fetched rows");
        Ok(rows)
    }
}

fn row_count(expected: &'static str, found: usize) -> anyhow::Error {
    Error::RowCount { expected, found }.into()
}
