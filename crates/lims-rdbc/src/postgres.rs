//! PostgreSQL backend implementation for lims-rdbc
//!
//! LIMS lives in PostgreSQL; this backend converts between tokio-postgres
//! rows and [`Row`], binds [`Value`] parameters and enforces the
//! configured timeouts.

use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_postgres::types::{FromSql, ToSql, Type};
use tokio_postgres::Column;

use crate::connection::{Connection, ConnectionConfig, ConnectionFactory};
use crate::error::{Error, Result};
use crate::types::{Row, Value};

/// Convert a Value to a tokio-postgres compatible parameter
fn value_to_sql(value: &Value) -> Box<dyn ToSql + Sync + Send> {
    match value {
        Value::Null => Box::new(Option::<i32>::None),
        Value::Bool(b) => Box::new(*b),
        Value::Int16(n) => Box::new(*n),
        Value::Int32(n) => Box::new(*n),
        Value::Int64(n) => Box::new(*n),
        Value::Float32(n) => Box::new(*n),
        Value::Float64(n) => Box::new(*n),
        Value::Decimal(d) => Box::new(*d),
        Value::String(s) => Box::new(s.clone()),
        Value::Bytes(b) => Box::new(b.clone()),
        Value::Json(j) => Box::new(j.clone()),
    }
}

/// Convert a tokio-postgres row to a Row
fn pg_row_to_row(pg_row: &tokio_postgres::Row) -> Result<Row> {
    let columns = pg_row
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let values = pg_row
        .columns()
        .iter()
        .enumerate()
        .map(|(i, col)| pg_value_to_value(pg_row, i, col))
        .collect::<Result<Vec<_>>>()?;

    Ok(Row::new(columns, values))
}

fn decode_failure(column: &str, source: impl std::fmt::Display) -> Error {
    Error::type_conversion(format!("cannot decode column '{}': {}", column, source))
}

/// Read one column as `Option<T>`; SQL NULL becomes `Value::Null`
fn get<'a, T>(
    row: &'a tokio_postgres::Row,
    idx: usize,
    column: &Column,
    wrap: fn(T) -> Value,
) -> Result<Value>
where
    T: FromSql<'a>,
{
    row.try_get::<_, Option<T>>(idx)
        .map(|value| value.map(wrap).unwrap_or(Value::Null))
        .map_err(|e| decode_failure(column.name(), e))
}

/// Convert a PostgreSQL value to a Value
fn pg_value_to_value(row: &tokio_postgres::Row, idx: usize, column: &Column) -> Result<Value> {
    match *column.type_() {
        Type::BOOL => get(row, idx, column, Value::Bool),
        Type::INT2 => get(row, idx, column, Value::Int16),
        Type::INT4 => get(row, idx, column, Value::Int32),
        Type::INT8 => get(row, idx, column, Value::Int64),
        Type::FLOAT4 => get(row, idx, column, Value::Float32),
        Type::FLOAT8 => get(row, idx, column, Value::Float64),
        Type::NUMERIC => get(row, idx, column, Value::Decimal),
        Type::BYTEA => get(row, idx, column, Value::Bytes),
        Type::JSON | Type::JSONB => get(row, idx, column, Value::Json),
        // VARCHAR, TEXT, BPCHAR, NAME and anything else that decodes as text
        _ => get(row, idx, column, Value::String),
    }
}

/// Server message of an authorization failure (SQLSTATE class 28)
fn auth_failure(e: &tokio_postgres::Error) -> Option<String> {
    e.as_db_error()
        .filter(|db| db.code().code().starts_with("28"))
        .map(|db| db.message().to_string())
}

fn map_pg_error(e: tokio_postgres::Error, sql: &str) -> Error {
    if let Some(message) = auth_failure(&e) {
        return Error::authentication(message);
    }
    if e.is_closed() {
        return Error::connection_with_source("connection closed", e);
    }
    Error::query(e.to_string(), sql, e)
}

/// Background task driving the socket of one tokio-postgres client
struct Driver(JoinHandle<()>);

impl Driver {
    fn spawn<F>(task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(tokio::spawn(task))
    }

    /// Stop driving the socket; the server sees the connection close
    fn shutdown(&self) {
        self.0.abort();
    }
}

/// PostgreSQL connection implementation
///
/// Created by [`PgConnectionFactory`]. [`Connection::close`] stops the
/// background task that owns the socket.
pub struct PgConnection {
    client: tokio_postgres::Client,
    driver: Driver,
    query_timeout: Option<Duration>,
    closed: AtomicBool,
}

impl PgConnection {
    fn new(client: tokio_postgres::Client, driver: Driver) -> Self {
        Self {
            client,
            driver,
            query_timeout: None,
            closed: AtomicBool::new(false),
        }
    }

    fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }
}

#[async_trait]
impl Connection for PgConnection {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(Error::connection("connection is closed"));
        }

        let boxed_params: Vec<Box<dyn ToSql + Sync + Send>> =
            params.iter().map(value_to_sql).collect();

        let param_refs: Vec<&(dyn ToSql + Sync)> = boxed_params
            .iter()
            .map(|b| b.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let fut = self.client.query(sql, &param_refs);
        let pg_rows = match self.query_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| Error::timeout(format!("query exceeded {:?}", limit)))?,
            None => fut.await,
        }
        .map_err(|e| map_pg_error(e, sql))?;

        pg_rows.iter().map(pg_row_to_row).collect()
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::Relaxed) {
            self.driver.shutdown();
            tracing::debug!("closed PostgreSQL connection");
        }
        Ok(())
    }
}

/// PostgreSQL connection factory
#[derive(Debug, Clone, Default)]
pub struct PgConnectionFactory;

#[async_trait]
impl ConnectionFactory for PgConnectionFactory {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        let mut pg_config: tokio_postgres::Config = config
            .url
            .parse()
            .map_err(|e| Error::connection_with_source("invalid connection url", e))?;

        if config.connect_timeout_ms > 0 {
            pg_config.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
        }
        if let Some(name) = &config.application_name {
            pg_config.application_name(name);
        }

        tracing::debug!(url = %config.redacted_url(), "connecting to PostgreSQL");

        let (client, connection) = pg_config
            .connect(tokio_postgres::NoTls)
            .await
            .map_err(|e| match auth_failure(&e) {
                Some(message) => Error::authentication(message),
                None => Error::connection_with_source("failed to connect", e),
            })?;

        // Drive the connection until the client is dropped or closed
        let driver = Driver::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!("PostgreSQL connection error: {}", e);
            }
        });

        let query_timeout =
            (config.query_timeout_ms > 0).then(|| Duration::from_millis(config.query_timeout_ms));

        Ok(Box::new(
            PgConnection::new(client, driver).with_query_timeout(query_timeout),
        ))
    }
}
