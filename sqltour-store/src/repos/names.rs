//! Name repository (`t1`)

use sqltour_core::Value;

use crate::error::StoreResult;
use crate::scope::Scope;

pub struct NameRepo<'a> {
    scope: &'a mut Scope,
}

impl<'a> NameRepo<'a> {
    pub fn new(scope: &'a mut Scope) -> Self {
        Self { scope }
    }

    /// Insert each name; names already present are skipped. Returns rows inserted.
    pub async fn insert_many(&mut self, names: &[&str]) -> StoreResult<u64> {
        const SQL: &str = "INSERT INTO t1 (name) VALUES ($1) ON CONFLICT (name) DO NOTHING";
        let mut inserted = 0;
        for name in names {
            self.scope.trace(SQL, &[Value::from(*name)]);
            inserted += sqlx::query(SQL)
                .bind(name.to_string())
                .execute(self.scope.conn())
                .await?
                .rows_affected();
        }
        Ok(inserted)
    }

    pub async fn find(&mut self, name: &str) -> StoreResult<Vec<String>> {
        const SQL: &str = "SELECT name FROM t1 WHERE name = $1";
        self.scope.trace(SQL, &[Value::from(name)]);
        Ok(sqlx::query_scalar(SQL)
            .bind(name.to_string())
            .fetch_all(self.scope.conn())
            .await?)
    }
}
