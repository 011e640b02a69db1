//! Windowing strategies: how a statement is limited to `take` rows after
//! skipping `skip`.
//!
//! Engines disagree on the syntax, so the strategy is injected into
//! [`Database`](crate::Database). [`LimitOffset`] is the default.

use std::fmt::Debug;

use crate::error::Error;
use crate::statement::Statement;

const ROW_NUMBER_COLUMN: &str = "rowmap_rn";

/// Rewrites a statement so it returns a bounded window of rows.
pub trait WindowStrategy: Debug + Send + Sync {
    /// Build the windowed statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy cannot express a window over
    /// `statement`.
    fn window(&self, statement: &Statement, skip: u64, take: u64) -> Result<String, Error>;
}

/// `LIMIT take OFFSET skip`, for `SQLite`, `PostgreSQL` and `MySQL`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LimitOffset;

impl WindowStrategy for LimitOffset {
    fn window(&self, statement: &Statement, skip: u64, take: u64) -> Result<String, Error> {
        Ok(format!("{} LIMIT {take} OFFSET {skip}", statement.sql()))
    }
}

/// `OFFSET skip ROWS FETCH NEXT take ROWS ONLY`, for SQL Server 2012+ and
/// Oracle 12c+.
///
/// The syntax requires an `ORDER BY`; statements without one are ordered by
/// `(SELECT NULL)`, which keeps the engine's natural order.
#[derive(Debug, Clone, Copy, Default)]
pub struct OffsetFetch;

impl WindowStrategy for OffsetFetch {
    fn window(&self, statement: &Statement, skip: u64, take: u64) -> Result<String, Error> {
        let order = statement.order_clause().unwrap_or_else(|| "ORDER BY (SELECT NULL)".to_string());
        Ok(format!("{} {order} OFFSET {skip} ROWS FETCH NEXT {take} ROWS ONLY", statement.body()))
    }
}

/// `ROW_NUMBER() OVER (...)` filtering, for engines without offset syntax.
///
/// The statement is wrapped as a derived table, so `ORDER BY` terms lose
/// their table qualifiers (`u.Name` becomes `Name`) and must name columns of
/// the projection. Rows carry an extra `rowmap_rn` column which mapping
/// ignores.
///
/// The `ORDER BY` moves ahead of the statement, so when both hold parameters
/// they must be numbered or named rather than anonymous `?`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowNumber;

impl WindowStrategy for RowNumber {
    fn window(&self, statement: &Statement, skip: u64, take: u64) -> Result<String, Error> {
        let upper = skip
            .checked_add(take)
            .ok_or_else(|| Error::InvalidPage(format!("window end overflows: {skip} + {take}")))?;
        if statement.order_binds_by_position() {
            return Err(Error::malformed(
                "ORDER BY parameters must be numbered or named to window with ROW_NUMBER",
            ));
        }

        let order = if statement.has_order_by() {
            let terms: Vec<&str> = statement.order_terms().iter().map(|t| unqualify(t)).collect();
            format!("ORDER BY {}", terms.join(", "))
        } else {
            "ORDER BY (SELECT NULL)".to_string()
        };

        Ok(format!(
            "SELECT * FROM (SELECT ROW_NUMBER() OVER ({order}) {ROW_NUMBER_COLUMN}, rowmap_base.* \
             FROM ({}) rowmap_base) rowmap_paged \
             WHERE {ROW_NUMBER_COLUMN} > {skip} AND {ROW_NUMBER_COLUMN} <= {upper} \
             ORDER BY {ROW_NUMBER_COLUMN}",
            statement.body()
        ))
    }
}

// Drops the `alias.` qualifier from a simple column term. Expressions are
// returned unchanged.
fn unqualify(term: &str) -> &str {
    let (column, direction) = term.split_once(' ').unwrap_or((term, ""));
    let simple = column
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'.' | b'"' | b'`' | b'[' | b']'))
        && direction
            .split_whitespace()
            .all(|w| ["ASC", "DESC", "NULLS", "FIRST", "LAST"].iter().any(|kw| w.eq_ignore_ascii_case(kw)));
    if !simple {
        return term;
    }
    column.rfind('.').map_or(term, |pos| &term[pos + 1..])
}
