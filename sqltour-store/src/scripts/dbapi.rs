//! Raw SQL against `some_table`: commit as you go, begin once, bound
//! parameters and executemany-style updates.

use std::fmt;

use serde::Serialize;

use sqltour_core::{catalog, params, Params, Record};

use crate::error::StoreResult;
use crate::pool::Engine;
use crate::text::TextQuery;

const INSERT: &str = "INSERT INTO some_table (x, y) VALUES (:x, :y)";
const SELECT_ALL: &str = "SELECT x, y FROM some_table ORDER BY x, y";

#[derive(Debug, Clone, Serialize)]
pub struct DbapiReport {
    /// Rows written on an autocommit connection.
    pub committed_as_you_go: u64,
    /// Rows written inside one scope.
    pub committed_in_block: u64,
    /// `y > 2`
    pub filtered: Vec<Record>,
    pub ordered: Vec<Record>,
    pub updated: u64,
    pub after_update: Vec<Record>,
}

fn write_rows(f: &mut fmt::Formatter<'_>, label: &str, rows: &[Record]) -> fmt::Result {
    writeln!(f, "{label}:")?;
    for row in rows {
        writeln!(f, "  {row}")?;
    }
    Ok(())
}

impl fmt::Display for DbapiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "inserted (commit as you go): {}", self.committed_as_you_go)?;
        writeln!(f, "inserted (begin once): {}", self.committed_in_block)?;
        write_rows(f, "y > 2", &self.filtered)?;
        write_rows(f, "ordered", &self.ordered)?;
        writeln!(f, "updated: {}", self.updated)?;
        write_rows(f, "after update", &self.after_update)
    }
}

pub async fn run(engine: &Engine) -> StoreResult<DbapiReport> {
    let metadata = catalog::some_table();
    let dialect = engine.dialect();

    // In-memory SQLite has a single pooled connection, so the autocommit
    // connection is released before any scope opens.
    let committed_as_you_go = {
        let mut conn = engine.connection().await?;
        conn.run_ddl(&metadata.drop_all_ddl(dialect)?).await?;
        conn.run_ddl(&metadata.create_all_ddl(dialect)?).await?;
        conn.execute_many(
            &TextQuery::new(INSERT),
            &[params! { "x" => 1, "y" => 1 }, params! { "x" => 2, "y" => 4 }],
        )
        .await?
    };

    let committed_in_block = engine
        .transaction(|scope| {
            Box::pin(async move {
                scope
                    .execute_many(
                        &TextQuery::new(INSERT),
                        &[params! { "x" => 6, "y" => 8 }, params! { "x" => 9, "y" => 10 }],
                    )
                    .await
            })
        })
        .await?;

    let filtered = {
        let mut conn = engine.connection().await?;
        conn.fetch_all(
            &TextQuery::new("SELECT x, y FROM some_table WHERE y > :y ORDER BY x, y"),
            &params! { "y" => 2 },
        )
        .await?
    };

    let ordered = {
        let mut scope = engine.begin().await?;
        let rows = scope
            .fetch_all(&TextQuery::new(SELECT_ALL), &Params::new())
            .await?;
        scope.commit().await?;
        rows
    };

    let updated = engine
        .transaction(|scope| {
            Box::pin(async move {
                scope
                    .execute_many(
                        &TextQuery::new("UPDATE some_table SET y = :y WHERE x = :x"),
                        &[params! { "x" => 9, "y" => 15 }, params! { "x" => 12, "y" => 16 }],
                    )
                    .await
            })
        })
        .await?;

    let after_update = {
        let mut conn = engine.connection().await?;
        conn.fetch_all(&TextQuery::new(SELECT_ALL), &Params::new())
            .await?
    };

    Ok(DbapiReport {
        committed_as_you_go,
        committed_in_block,
        filtered,
        ordered,
        updated,
        after_update,
    })
}
