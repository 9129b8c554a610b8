//! Transactional scopes and autocommit connections
//!
//! A [`Scope`] owns one store transaction. It ends exactly once: `commit` and
//! `rollback` consume it, and dropping it without either rolls back.
//! Statements inside a scope run one after another (`&mut self`).

use sqlx::any::Any;
use sqlx::pool::PoolConnection;
use sqlx::{AnyConnection, Transaction};
use tracing::debug;

use sqltour_core::{Dialect, Params, Record, Value};

use crate::error::StoreResult;
use crate::text::{self, TextQuery};

pub struct Scope {
    tx: Transaction<'static, Any>,
    id: u64,
    dialect: Dialect,
    echo: bool,
    statements: u32,
}

impl Scope {
    pub(crate) fn new(tx: Transaction<'static, Any>, id: u64, dialect: Dialect, echo: bool) -> Self {
        debug!(scope = id, "scope begin");
        Self {
            tx,
            id,
            dialect,
            echo,
            statements: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Statements issued so far in this scope.
    pub fn statements(&self) -> u32 {
        self.statements
    }

    pub async fn commit(self) -> StoreResult<()> {
        let Scope {
            tx, id, statements, ..
        } = self;
        tx.commit().await?;
        debug!(scope = id, statements, "scope committed");
        Ok(())
    }

    pub async fn rollback(self) -> StoreResult<()> {
        let Scope {
            tx, id, statements, ..
        } = self;
        tx.rollback().await?;
        debug!(scope = id, statements, "scope rolled back");
        Ok(())
    }

    pub async fn execute(&mut self, query: &TextQuery, params: &Params) -> StoreResult<u64> {
        self.statements += 1;
        text::execute(&mut self.tx, self.echo, Some(self.id), query, params).await
    }

    pub async fn execute_many(&mut self, query: &TextQuery, param_sets: &[Params]) -> StoreResult<u64> {
        self.statements += param_sets.len() as u32;
        text::execute_many(&mut self.tx, self.echo, Some(self.id), query, param_sets).await
    }

    pub async fn fetch_all(&mut self, query: &TextQuery, params: &Params) -> StoreResult<Vec<Record>> {
        self.statements += 1;
        text::fetch_all(&mut self.tx, self.echo, Some(self.id), query, params).await
    }

    /// Run pre-rendered DDL statements in order.
    pub async fn run_ddl(&mut self, statements: &[String]) -> StoreResult<()> {
        for ddl in statements {
            self.trace(ddl, &[]);
            sqlx::query(ddl).execute(&mut *self.tx).await?;
        }
        Ok(())
    }

    /// Log a repository statement and count it against this scope.
    pub(crate) fn trace(&mut self, sql: &str, values: &[Value]) {
        self.statements += 1;
        text::log_statement(self.echo, Some(self.id), sql, values);
    }

    pub(crate) fn conn(&mut self) -> &mut AnyConnection {
        &mut self.tx
    }
}

/// Pooled connection outside any scope: every statement commits on its own.
pub struct Connection {
    conn: PoolConnection<Any>,
    dialect: Dialect,
    echo: bool,
}

impl Connection {
    pub(crate) fn new(conn: PoolConnection<Any>, dialect: Dialect, echo: bool) -> Self {
        Self {
            conn,
            dialect,
            echo,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub async fn execute(&mut self, query: &TextQuery, params: &Params) -> StoreResult<u64> {
        text::execute(&mut self.conn, self.echo, None, query, params).await
    }

    pub async fn execute_many(&mut self, query: &TextQuery, param_sets: &[Params]) -> StoreResult<u64> {
        text::execute_many(&mut self.conn, self.echo, None, query, param_sets).await
    }

    pub async fn fetch_all(&mut self, query: &TextQuery, params: &Params) -> StoreResult<Vec<Record>> {
        text::fetch_all(&mut self.conn, self.echo, None, query, params).await
    }

    pub async fn run_ddl(&mut self, statements: &[String]) -> StoreResult<()> {
        for ddl in statements {
            text::log_statement(self.echo, None, ddl, &[]);
            sqlx::query(ddl).execute(&mut *self.conn).await?;
        }
        Ok(())
    }
}
