//! Raw SQL with named bind parameters
//!
//! `TextQuery` takes SQL written with `:name` placeholders and rewrites it to
//! the positional `$n` form both sqlx drivers accept. A name used twice maps
//! to one slot. Quoted literals, quoted identifiers, `--` and `/* */`
//! comments and Postgres `::type` casts pass through untouched; `\:` yields a
//! literal colon.

use sqlx::any::{Any, AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{AnyConnection, Column, Row};
use tracing::{debug, info};

use sqltour_core::{Params, Record, Value};

use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuery {
    source: String,
    sql: String,
    names: Vec<String>,
}

impl TextQuery {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let (sql, names) = rewrite_named(&source);
        Self { source, sql, names }
    }

    /// SQL as written, with `:name` placeholders.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// SQL as sent to the store, with `$n` placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameter names in slot order.
    pub fn param_names(&self) -> &[String] {
        &self.names
    }

    /// Positional values for one parameter set. Extra keys are ignored.
    pub fn bind_values(&self, params: &Params) -> StoreResult<Vec<Value>> {
        self.names
            .iter()
            .map(|name| {
                params
                    .get(name)
                    .cloned()
                    .ok_or_else(|| StoreError::MissingParam(name.clone()))
            })
            .collect()
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn rewrite_named(source: &str) -> (String, Vec<String>) {
    let chars: Vec<char> = source.chars().collect();
    let mut sql = String::with_capacity(source.len());
    let mut names: Vec<String> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                // copy through the closing quote; doubled quotes reopen immediately
                sql.push(c);
                i += 1;
                while i < chars.len() {
                    sql.push(chars[i]);
                    i += 1;
                    if chars[i - 1] == c {
                        break;
                    }
                }
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                while i < chars.len() && chars[i] != '\n' {
                    sql.push(chars[i]);
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                // unterminated comments run to the end of the text
                let end = (i + 2..chars.len().saturating_sub(1))
                    .find(|&j| chars[j] == '*' && chars[j + 1] == '/')
                    .map_or(chars.len(), |j| j + 2);
                sql.extend(&chars[i..end]);
                i = end;
            }
            '\\' if chars.get(i + 1) == Some(&':') => {
                sql.push(':');
                i += 2;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                sql.push_str("::");
                i += 2;
            }
            ':' if chars.get(i + 1).is_some_and(|n| is_ident_start(*n)) => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_ident_char(chars[end]) {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                let slot = match names.iter().position(|n| *n == name) {
                    Some(existing) => existing,
                    None => {
                        names.push(name);
                        names.len() - 1
                    }
                };
                sql.push_str(&format!("${}", slot + 1));
                i = end;
            }
            _ => {
                sql.push(c);
                i += 1;
            }
        }
    }

    (sql, names)
}

pub(crate) type AnyQuery<'q> = Query<'q, Any, AnyArguments<'q>>;

/// NULL goes out typed as BIGINT; Postgres will assign it to integer and text
/// columns alike.
pub(crate) fn bind_all<'q>(mut query: AnyQuery<'q>, values: &[Value]) -> AnyQuery<'q> {
    for value in values {
        query = match value {
            Value::Null => query.bind(None::<i64>),
            Value::Int(v) => query.bind(*v),
            Value::Real(v) => query.bind(*v),
            Value::Text(v) => query.bind(v.clone()),
            Value::Bool(v) => query.bind(*v),
        };
    }
    query
}

/// Statement logging: INFO when the engine echoes, DEBUG otherwise.
pub(crate) fn log_statement(echo: bool, scope: Option<u64>, sql: &str, values: &[Value]) {
    if echo {
        info!(target: "sqltour::echo", scope = ?scope, params = ?values, "{}", sql);
    } else {
        debug!(target: "sqltour::echo", scope = ?scope, params = ?values, "{}", sql);
    }
}

fn decode_value(row: &AnyRow, index: usize) -> StoreResult<Value> {
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return Ok(v.into());
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(index) {
        return Ok(v.into());
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return Ok(v.into());
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return Ok(v.into());
    }
    Ok(row.try_get::<Option<String>, _>(index)?.into())
}

pub(crate) fn record_from_row(row: &AnyRow) -> StoreResult<Record> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        columns.push(column.name().to_string());
        values.push(decode_value(row, index)?);
    }
    Ok(Record::new(columns, values))
}

pub(crate) async fn execute(
    conn: &mut AnyConnection,
    echo: bool,
    scope: Option<u64>,
    query: &TextQuery,
    params: &Params,
) -> StoreResult<u64> {
    let values = query.bind_values(params)?;
    log_statement(echo, scope, query.sql(), &values);
    let result = bind_all(sqlx::query(query.sql()), &values)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Run one statement per parameter set, in order; returns total rows affected.
pub(crate) async fn execute_many(
    conn: &mut AnyConnection,
    echo: bool,
    scope: Option<u64>,
    query: &TextQuery,
    param_sets: &[Params],
) -> StoreResult<u64> {
    // check every set before the first statement runs
    let bound = param_sets
        .iter()
        .map(|params| query.bind_values(params))
        .collect::<StoreResult<Vec<_>>>()?;

    let mut affected = 0;
    for values in bound {
        log_statement(echo, scope, query.sql(), &values);
        affected += bind_all(sqlx::query(query.sql()), &values)
            .execute(&mut *conn)
            .await?
            .rows_affected();
    }
    Ok(affected)
}

pub(crate) async fn fetch_all(
    conn: &mut AnyConnection,
    echo: bool,
    scope: Option<u64>,
    query: &TextQuery,
    params: &Params,
) -> StoreResult<Vec<Record>> {
    let values = query.bind_values(params)?;
    log_statement(echo, scope, query.sql(), &values);
    let rows = bind_all(sqlx::query(query.sql()), &values)
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(record_from_row).collect()
}
