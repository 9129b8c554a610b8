//! Engine: pooled access to the backing store
//!
//! Uses the sqlx `Any` driver so one binary talks to SQLite or Postgres,
//! chosen by the store URL. The engine is built explicitly, passed to every
//! operation, and disposed explicitly at the end.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use tracing::{info, warn};

use sqltour_core::{Dialect, Metadata, StoreConfig, StoreUrl};

use crate::error::StoreResult;
use crate::scope::{Connection, Scope};

pub struct Engine {
    pool: AnyPool,
    url: StoreUrl,
    echo: bool,
    next_scope: AtomicU64,
}

impl Engine {
    /// Create the pool described by `config`.
    ///
    /// In-memory SQLite gets exactly one connection that never expires:
    /// every new connection would otherwise open a fresh, empty database.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL names an unknown dialect or the first
    /// connection fails.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        sqlx::any::install_default_drivers();

        let url = config.store_url()?;
        let options = AnyPoolOptions::new()
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));
        let options = if url.is_memory() {
            options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            options.max_connections(config.max_connections)
        };

        let pool = options.connect(&url.url).await?;
        info!(dialect = %url.dialect, memory = url.is_memory(), "engine connected");

        Ok(Self {
            pool,
            url,
            echo: config.echo,
            next_scope: AtomicU64::new(1),
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.url.dialect
    }

    pub fn echo(&self) -> bool {
        self.echo
    }

    /// Open a transactional scope.
    pub async fn begin(&self) -> StoreResult<Scope> {
        let tx = self.pool.begin().await?;
        let id = self.next_scope.fetch_add(1, Ordering::Relaxed);
        Ok(Scope::new(tx, id, self.dialect(), self.echo))
    }

    /// Run `f` inside a fresh scope: commit on `Ok`, roll back on `Err`.
    ///
    /// The closure's error is returned unchanged; a failed rollback is only
    /// logged since the transaction is discarded by the store either way.
    ///
    /// ```ignore
    /// let id = engine
    ///     .transaction(|scope| Box::pin(async move { UserRepo::new(scope).insert(user).await }))
    ///     .await?;
    /// ```
    pub async fn transaction<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: for<'c> FnOnce(&'c mut Scope) -> BoxFuture<'c, StoreResult<T>>,
    {
        let mut scope = self.begin().await?;
        match f(&mut scope).await {
            Ok(value) => {
                scope.commit().await?;
                Ok(value)
            }
            Err(err) => {
                let id = scope.id();
                warn!(scope = id, error = %err, "scope failed");
                if let Err(rollback_err) = scope.rollback().await {
                    warn!(scope = id, error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Acquire a connection outside any scope ("commit as you go").
    pub async fn connection(&self) -> StoreResult<Connection> {
        let conn = self.pool.acquire().await?;
        Ok(Connection::new(conn, self.dialect(), self.echo))
    }

    /// `CREATE TABLE IF NOT EXISTS` for every table, dependencies first, in one scope.
    pub async fn create_all(&self, metadata: &Metadata) -> StoreResult<()> {
        let ddl = metadata.create_all_ddl(self.dialect())?;
        let mut scope = self.begin().await?;
        scope.run_ddl(&ddl).await?;
        scope.commit().await?;
        info!(tables = ?metadata.table_names(), "schema created");
        Ok(())
    }

    /// `DROP TABLE IF EXISTS` for every table, dependents first, in one scope.
    pub async fn drop_all(&self, metadata: &Metadata) -> StoreResult<()> {
        let ddl = metadata.drop_all_ddl(self.dialect())?;
        let mut scope = self.begin().await?;
        scope.run_ddl(&ddl).await?;
        scope.commit().await?;
        info!(tables = ?metadata.table_names(), "schema dropped");
        Ok(())
    }

    /// Close every pooled connection. Consumes the engine.
    pub async fn dispose(self) {
        self.pool.close().await;
        info!(dialect = %self.url.dialect, "engine disposed");
    }
}
