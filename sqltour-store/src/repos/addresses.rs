//! Address repository
//!
//! The two insert paths mirror the core-layer walkthrough:
//! - insert_for_username: user_id comes from a scalar subquery on the name
//! - insert_from_select: INSERT … SELECT deriving one address per user

use sqlx::any::AnyRow;
use sqlx::Row;

use sqltour_core::{Address, Value};

use crate::error::StoreResult;
use crate::scope::Scope;

fn address_from_row(row: &AnyRow) -> StoreResult<Address> {
    Ok(Address {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        email_address: row.try_get("email_address")?,
    })
}

pub struct AddressRepo<'a> {
    scope: &'a mut Scope,
}

impl<'a> AddressRepo<'a> {
    pub fn new(scope: &'a mut Scope) -> Self {
        Self { scope }
    }

    /// Insert an address owned by the user called `username`.
    ///
    /// An unknown name makes the subquery NULL and the store rejects the row
    /// through the NOT NULL foreign key.
    pub async fn insert_for_username(&mut self, username: &str, email: &str) -> StoreResult<i64> {
        const SQL: &str = r#"
            INSERT INTO address (user_id, email_address)
            VALUES ((SELECT id FROM user_account WHERE name = $1 ORDER BY id LIMIT 1), $2)
            RETURNING id
        "#;
        self.scope
            .trace(SQL, &[Value::from(username), Value::from(email)]);
        let id: i64 = sqlx::query_scalar(SQL)
            .bind(username.to_string())
            .bind(email.to_string())
            .fetch_one(self.scope.conn())
            .await?;
        Ok(id)
    }

    /// One address per user with a fullname: `fullname || suffix`.
    pub async fn insert_from_select(&mut self, suffix: &str) -> StoreResult<u64> {
        const SQL: &str = r#"
            INSERT INTO address (user_id, email_address)
            SELECT id, fullname || $1 FROM user_account
            WHERE fullname IS NOT NULL
            ORDER BY id
        "#;
        self.scope.trace(SQL, &[Value::from(suffix)]);
        let result = sqlx::query(SQL)
            .bind(suffix.to_string())
            .execute(self.scope.conn())
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn list_for_user(&mut self, user_id: i64) -> StoreResult<Vec<Address>> {
        const SQL: &str =
            "SELECT id, user_id, email_address FROM address WHERE user_id = $1 ORDER BY id";
        self.scope.trace(SQL, &[Value::Int(user_id)]);
        let rows = sqlx::query(SQL)
            .bind(user_id)
            .fetch_all(self.scope.conn())
            .await?;
        rows.iter().map(address_from_row).collect()
    }

    pub async fn count(&mut self) -> StoreResult<i64> {
        const SQL: &str = "SELECT COUNT(*) FROM address";
        self.scope.trace(SQL, &[]);
        Ok(sqlx::query_scalar(SQL).fetch_one(self.scope.conn()).await?)
    }
}
