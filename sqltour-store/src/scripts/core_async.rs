use std::fmt;

use serde::Serialize;

use sqltour_core::{catalog, params};

use crate::error::StoreResult;
use crate::pool::Engine;
use crate::repos::NameRepo;
use crate::text::TextQuery;

const NAMES: [&str; 2] = ["some name 1", "some name 2"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoreAsyncReport {
    pub inserted: u64,
    pub found: Vec<String>,
}

impl fmt::Display for CoreAsyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "inserted: {}", self.inserted)?;
        for name in &self.found {
            writeln!(f, "('{name}',)")?;
        }
        Ok(())
    }
}

/// Create `t1` and insert two names in one scope, then look one up on a fresh connection.
pub async fn run(engine: &Engine) -> StoreResult<CoreAsyncReport> {
    let metadata = catalog::t1();
    let drop = metadata.drop_all_ddl(engine.dialect())?;
    let create = metadata.create_all_ddl(engine.dialect())?;

    let inserted = engine
        .transaction(|scope| {
            Box::pin(async move {
                scope.run_ddl(&drop).await?;
                scope.run_ddl(&create).await?;
                NameRepo::new(scope).insert_many(&NAMES).await
            })
        })
        .await?;

    let mut conn = engine.connection().await?;
    let found = conn
        .fetch_all(
            &TextQuery::new("SELECT name FROM t1 WHERE name = :name"),
            &params! { "name" => NAMES[0] },
        )
        .await?
        .iter()
        .filter_map(|row| row.get("name").and_then(|v| v.as_str()).map(str::to_string))
        .collect();

    Ok(CoreAsyncReport { inserted, found })
}
