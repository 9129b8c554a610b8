//! Core-layer inserts into `user_account` / `address`.

use std::fmt;

use serde::Serialize;

use sqltour_core::{catalog, NewUser, User};

use crate::error::{StoreError, StoreResult};
use crate::pool::Engine;
use crate::repos::{AddressRepo, UserRepo};

use super::fresh_schema;

/// `(username, email)` pairs written through the scalar-subquery insert.
const ADDRESSES: [(&str, &str); 3] = [
    ("spongebob", "spongebob@sqlalchemy.org"),
    ("sandy", "sandy@sqlalchemy.org"),
    ("sandy", "sandy@squirrelpower.org"),
];

#[derive(Debug, Clone, Serialize)]
pub struct CoreInsertReport {
    /// Primary key handed back by the single-row insert.
    pub inserted_primary_key: i64,
    pub bulk_ids: Vec<i64>,
    pub subquery_address_ids: Vec<i64>,
    /// Rows written by INSERT … SELECT.
    pub derived_addresses: u64,
    pub user_count: i64,
    pub address_count: i64,
    pub users: Vec<User>,
}

impl fmt::Display for CoreInsertReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "inserted primary key: ({},)", self.inserted_primary_key)?;
        writeln!(f, "bulk insert ids: {:?}", self.bulk_ids)?;
        writeln!(f, "addresses via subquery: {:?}", self.subquery_address_ids)?;
        writeln!(f, "addresses via INSERT ... SELECT: {}", self.derived_addresses)?;
        writeln!(f, "users: {}, addresses: {}", self.user_count, self.address_count)?;
        for user in &self.users {
            let fullname = user.fullname.as_deref().unwrap_or("-");
            writeln!(f, "  User(id={}, name={}, fullname={fullname})", user.id, user.name)?;
            for address in user.addresses().map_err(|_| fmt::Error)? {
                writeln!(f, "    Address(id={}, email_address={})", address.id, address.email_address)?;
            }
        }
        Ok(())
    }
}

pub async fn run(engine: &Engine) -> StoreResult<CoreInsertReport> {
    fresh_schema(engine, &catalog::user_address()).await?;

    let inserted_primary_key = engine
        .transaction(|scope| {
            Box::pin(async move {
                UserRepo::new(scope)
                    .insert(&NewUser::new("spongebob", "Spongebob Squarepants"))
                    .await
            })
        })
        .await?;

    let bulk_ids = engine
        .transaction(|scope| {
            Box::pin(async move {
                UserRepo::new(scope)
                    .insert_many(&[
                        NewUser::new("sandy", "Sandy Cheeks"),
                        NewUser::new("patrick", "Patrick Star"),
                    ])
                    .await
            })
        })
        .await?;

    let subquery_address_ids = engine
        .transaction(|scope| {
            Box::pin(async move {
                let mut repo = AddressRepo::new(scope);
                let mut ids = Vec::with_capacity(ADDRESSES.len());
                for (username, email) in ADDRESSES {
                    ids.push(repo.insert_for_username(username, email).await?);
                }
                Ok::<_, StoreError>(ids)
            })
        })
        .await?;

    let derived_addresses = engine
        .transaction(|scope| {
            Box::pin(async move { AddressRepo::new(scope).insert_from_select("@aol.com").await })
        })
        .await?;

    let mut scope = engine.begin().await?;
    let (users, user_count) = {
        let mut repo = UserRepo::new(&mut scope);
        let mut users = repo.list().await?;
        for user in &mut users {
            repo.load_addresses(user).await?;
        }
        let count = repo.count().await?;
        (users, count)
    };
    let address_count = AddressRepo::new(&mut scope).count().await?;
    scope.commit().await?;

    Ok(CoreInsertReport {
        inserted_primary_key,
        bulk_ids,
        subquery_address_ids,
        derived_addresses,
        user_count,
        address_count,
        users,
    })
}
