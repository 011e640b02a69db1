use std::fmt::Debug;

use crate::traits::FutureResult;
use crate::types::{DataType, Row};

/// SQL providers implement the [`Connection`] trait to let the mapper run
/// statements against a backend (`SQLite`, Postgres, etc).
///
/// Implementations pass backend failures through unchanged; retries, if any,
/// belong here rather than in the mapper.
pub trait Connection: Debug + Send + Sync + 'static {
    /// Execute a query and return the resulting rows.
    fn query(&self, query: String, params: Vec<DataType>) -> FutureResult<Vec<Row>>;

    /// Execute a batch of statements and return one row set per statement
    /// that produces rows, in order.
    fn query_multiple(&self, query: String, params: Vec<DataType>) -> FutureResult<Vec<Vec<Row>>>;

    /// Execute a query and return the first column of the first row as an
    /// integer (e.g. a `COUNT(*)`).
    fn scalar(&self, query: String, params: Vec<DataType>) -> FutureResult<i64>;

    /// Execute a statement that does not return rows (e.g., an `INSERT`, `UPDATE`, or `DELETE`).
    fn exec(&self, query: String, params: Vec<DataType>) -> FutureResult<u32>;
}
