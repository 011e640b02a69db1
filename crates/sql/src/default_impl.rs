//! Default `SQLite` implementation of [`Connection`].
//!
//! This is a lightweight implementation for development use only.

#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

use std::sync::Arc;

use anyhow::{Context, Result};
use fromenv::FromEnv;
use futures::FutureExt;
use rusqlite::fallible_iterator::FallibleIterator;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Batch, Connection as SqliteConnection, Statement, params_from_iter};
use tracing::instrument;

use crate::resource::Connection;
use crate::traits::{Backend, FutureResult};
use crate::types::{DataType, Field, Row};

/// Options used to connect to the SQL database.
///
/// This struct is used to load connection options from environment variables.
#[derive(Debug, Clone, FromEnv)]
pub struct ConnectOptions {
    /// Database path or `SQLite` URI.
    #[env(from = "SQL_DATABASE", default = "file::memory:?cache=shared")]
    pub database: String,
}

impl crate::FromEnv for ConnectOptions {
    fn from_env() -> Result<Self> {
        Self::from_env().finalize().context("issue loading connection options")
    }
}

/// Default `SQLite` backed [`Connection`].
#[derive(Debug, Clone)]
pub struct SqlDefault {
    // Mutex is necessary since rusqlite::Connection isn't `Sync`
    conn: Arc<parking_lot::Mutex<SqliteConnection>>,
}

impl Backend for SqlDefault {
    type ConnectOptions = ConnectOptions;

    #[instrument]
    async fn connect_with(options: Self::ConnectOptions) -> Result<Self> {
        tracing::debug!("initializing SQLite connection to: {}", options.database);

        let conn = Arc::new(parking_lot::Mutex::new(
            SqliteConnection::open(&options.database).context("failed to open SQLite database")?,
        ));

        Ok(Self { conn })
    }
}

impl Connection for SqlDefault {
    fn query(&self, query: String, params: Vec<DataType>) -> FutureResult<Vec<Row>> {
        tracing::debug!(sql = %query, param_count = params.len(), "executing query");
        let conn = Arc::clone(&self.conn);

        async move {
            let conn = conn.lock();
            let mut stmt = conn.prepare(&query).context("failed to prepare statement")?;
            let values: Vec<Value> = params.iter().map(datatype_to_rusqlite_value).collect();
            collect_rows(&mut stmt, &values)
        }
        .boxed()
    }

    fn query_multiple(&self, query: String, params: Vec<DataType>) -> FutureResult<Vec<Vec<Row>>> {
        tracing::debug!(sql = %query, param_count = params.len(), "executing batch query");
        let conn = Arc::clone(&self.conn);

        async move {
            let conn = conn.lock();
            let values: Vec<Value> = params.iter().map(datatype_to_rusqlite_value).collect();

            let mut batch = Batch::new(&conn, &query);
            let mut result_sets = Vec::new();
            while let Some(mut stmt) = batch.next().context("failed to prepare statement")? {
                // each statement binds as many leading parameters as it declares
                let bound = &values[..stmt.parameter_count().min(values.len())];
                if stmt.column_count() == 0 {
                    stmt.execute(params_from_iter(bound.iter()))
                        .context("failed to execute statement")?;
                    continue;
                }
                result_sets.push(collect_rows(&mut stmt, bound)?);
            }

            Ok(result_sets)
        }
        .boxed()
    }

    fn scalar(&self, query: String, params: Vec<DataType>) -> FutureResult<i64> {
        tracing::debug!(sql = %query, param_count = params.len(), "executing scalar query");
        let conn = Arc::clone(&self.conn);

        async move {
            let conn = conn.lock();
            let values: Vec<Value> = params.iter().map(datatype_to_rusqlite_value).collect();
            conn.query_row(&query, params_from_iter(values.iter()), |row| row.get::<_, i64>(0))
                .context("failed to execute scalar query")
        }
        .boxed()
    }

    fn exec(&self, query: String, params: Vec<DataType>) -> FutureResult<u32> {
        tracing::debug!(sql = %query, param_count = params.len(), "executing statement");
        let conn = Arc::clone(&self.conn);

        async move {
            let conn = conn.lock();
            let mut stmt = conn.prepare(&query).context("failed to prepare statement")?;
            let values: Vec<Value> = params.iter().map(datatype_to_rusqlite_value).collect();

            let rows_affected = stmt
                .execute(params_from_iter(values.iter()))
                .context("failed to execute statement")?;

            Ok(rows_affected as u32)
        }
        .boxed()
    }
}

fn collect_rows(stmt: &mut Statement<'_>, params: &[Value]) -> Result<Vec<Row>> {
    let column_names: Vec<String> = stmt.column_names().iter().map(ToString::to_string).collect();

    let mut rows = stmt.query(params_from_iter(params.iter())).context("failed to execute query")?;

    let mut result_rows = Vec::new();
    while let Some(row) = rows.next().context("failed to fetch row")? {
        let mut fields = Vec::with_capacity(column_names.len());
        for (i, name) in column_names.iter().enumerate() {
            let value = row.get_ref(i).context("failed to get column value")?;
            fields.push(Field {
                name: name.clone(),
                value: rusqlite_value_to_datatype(value)?,
            });
        }
        result_rows.push(Row { fields });
    }

    Ok(result_rows)
}

fn datatype_to_rusqlite_value(dt: &DataType) -> Value {
    match dt {
        DataType::Boolean(Some(b)) => Value::Integer(i64::from(*b)),
        DataType::Int32(Some(i)) => Value::Integer(i64::from(*i)),
        DataType::Int64(Some(i)) => Value::Integer(*i),
        DataType::Uint32(Some(u)) => Value::Integer(i64::from(*u)),
        DataType::Uint64(Some(u)) => Value::Integer(*u as i64),
        DataType::Float(Some(f)) => Value::Real(f64::from(*f)),
        DataType::Double(Some(f)) => Value::Real(*f),
        DataType::Str(Some(s))
        | DataType::Date(Some(s))
        | DataType::Time(Some(s))
        | DataType::Timestamp(Some(s)) => Value::Text(s.clone()),
        DataType::Binary(Some(b)) => Value::Blob(b.clone()),
        // All None variants map to NULL
        _ => Value::Null,
    }
}

fn rusqlite_value_to_datatype(value: ValueRef) -> Result<DataType> {
    match value {
        ValueRef::Null => Ok(DataType::Str(None)),
        ValueRef::Integer(i) => Ok(DataType::Int64(Some(i))),
        ValueRef::Real(f) => Ok(DataType::Double(Some(f))),
        ValueRef::Text(t) => {
            let s = std::str::from_utf8(t).context("invalid UTF-8 in text value")?;
            Ok(DataType::Str(Some(s.to_string())))
        }
        ValueRef::Blob(b) => Ok(DataType::Binary(Some(b.to_vec()))),
    }
}
