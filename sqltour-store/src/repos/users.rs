//! User repository
//!
//! Handles `user_account` rows:
//! - insert / insert_many: one INSERT … RETURNING id per user
//! - get: lookup by primary key, NotFound when missing
//! - load_addresses: explicit fill of the one-to-many side

use sqlx::any::AnyRow;
use sqlx::Row;

use sqltour_core::{NewUser, Related, User, Value};

use super::AddressRepo;
use crate::error::{StoreError, StoreResult};
use crate::scope::Scope;

fn user_from_row(row: &AnyRow) -> StoreResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        fullname: row.try_get("fullname")?,
        addresses: Related::Unloaded,
    })
}

/// User repository
pub struct UserRepo<'a> {
    scope: &'a mut Scope,
}

impl<'a> UserRepo<'a> {
    pub fn new(scope: &'a mut Scope) -> Self {
        Self { scope }
    }

    /// Insert one user and return the primary key the store assigned.
    pub async fn insert(&mut self, user: &NewUser) -> StoreResult<i64> {
        const SQL: &str = "INSERT INTO user_account (name, fullname) VALUES ($1, $2) RETURNING id";
        self.scope.trace(
            SQL,
            &[Value::from(user.name.as_str()), Value::from(user.fullname.clone())],
        );
        let id: i64 = sqlx::query_scalar(SQL)
            .bind(user.name.clone())
            .bind(user.fullname.clone())
            .fetch_one(self.scope.conn())
            .await?;
        Ok(id)
    }

    /// Insert users in order, returning their keys in the same order.
    pub async fn insert_many(&mut self, users: &[NewUser]) -> StoreResult<Vec<i64>> {
        let mut ids = Vec::with_capacity(users.len());
        for user in users {
            ids.push(self.insert(user).await?);
        }
        Ok(ids)
    }

    pub async fn get(&mut self, id: i64) -> StoreResult<User> {
        const SQL: &str = "SELECT id, name, fullname FROM user_account WHERE id = $1";
        self.scope.trace(SQL, &[Value::Int(id)]);
        let row = sqlx::query(SQL)
            .bind(id)
            .fetch_optional(self.scope.conn())
            .await?
            .ok_or_else(|| StoreError::not_found("user", id))?;
        user_from_row(&row)
    }

    /// First user (lowest id) with the given name.
    pub async fn find_by_name(&mut self, name: &str) -> StoreResult<Option<User>> {
        const SQL: &str =
            "SELECT id, name, fullname FROM user_account WHERE name = $1 ORDER BY id LIMIT 1";
        self.scope.trace(SQL, &[Value::from(name)]);
        let row = sqlx::query(SQL)
            .bind(name.to_string())
            .fetch_optional(self.scope.conn())
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn list(&mut self) -> StoreResult<Vec<User>> {
        const SQL: &str = "SELECT id, name, fullname FROM user_account ORDER BY id";
        self.scope.trace(SQL, &[]);
        let rows = sqlx::query(SQL).fetch_all(self.scope.conn()).await?;
        rows.iter().map(user_from_row).collect()
    }

    pub async fn count(&mut self) -> StoreResult<i64> {
        const SQL: &str = "SELECT COUNT(*) FROM user_account";
        self.scope.trace(SQL, &[]);
        Ok(sqlx::query_scalar(SQL).fetch_one(self.scope.conn()).await?)
    }

    /// Fill `user.addresses` from the store.
    pub async fn load_addresses(&mut self, user: &mut User) -> StoreResult<()> {
        let addresses = AddressRepo::new(self.scope).list_for_user(user.id).await?;
        user.addresses = Related::Loaded(addresses);
        Ok(())
    }
}
