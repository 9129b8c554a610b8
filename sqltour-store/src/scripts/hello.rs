use std::fmt;

use serde::Serialize;

use sqltour_core::{Params, Value};

use crate::error::{StoreError, StoreResult};
use crate::pool::Engine;
use crate::text::TextQuery;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelloReport {
    pub greeting: String,
}

impl fmt::Display for HelloReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.greeting)
    }
}

/// `SELECT 'Hello World'` on an autocommit connection.
pub async fn run(engine: &Engine) -> StoreResult<HelloReport> {
    let mut conn = engine.connection().await?;
    let rows = conn
        .fetch_all(&TextQuery::new("SELECT 'Hello World' AS greeting"), &Params::new())
        .await?;

    let greeting = rows
        .first()
        .and_then(|row| row.get("greeting"))
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::not_found("row", "greeting"))?;

    Ok(HelloReport {
        greeting: greeting.to_string(),
    })
}
