//! Tour scripts
//!
//! Each script takes the engine, runs one linear walkthrough against the store
//! and returns a serializable report. Scripts begin by dropping and recreating
//! the tables they use so a report reads the same on every run.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::info;

use sqltour_core::Metadata;

use crate::error::StoreResult;
use crate::pool::Engine;

pub mod core_async;
pub mod core_insert;
pub mod dbapi;
pub mod hello;
pub mod mapped_classes;
pub mod orm_async;

pub use core_async::CoreAsyncReport;
pub use core_insert::CoreInsertReport;
pub use dbapi::DbapiReport;
pub use hello::HelloReport;
pub use mapped_classes::MappedClassesReport;
pub use orm_async::OrmAsyncReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptName {
    Hello,
    Dbapi,
    MappedClasses,
    CoreInsert,
    CoreAsync,
    OrmAsync,
    All,
}

impl ScriptName {
    /// Every single script, in the order `all` runs them.
    pub const SEQUENCE: [ScriptName; 6] = [
        ScriptName::Hello,
        ScriptName::Dbapi,
        ScriptName::MappedClasses,
        ScriptName::CoreInsert,
        ScriptName::CoreAsync,
        ScriptName::OrmAsync,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScriptName::Hello => "hello",
            ScriptName::Dbapi => "dbapi",
            ScriptName::MappedClasses => "mapped-classes",
            ScriptName::CoreInsert => "core-insert",
            ScriptName::CoreAsync => "core-async",
            ScriptName::OrmAsync => "orm-async",
            ScriptName::All => "all",
        }
    }
}

impl fmt::Display for ScriptName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::SEQUENCE
            .into_iter()
            .chain([ScriptName::All])
            .find(|name| name.as_str() == normalized)
            .ok_or_else(|| format!("unknown script '{s}'"))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "script", rename_all = "snake_case")]
pub enum Report {
    Hello(HelloReport),
    Dbapi(DbapiReport),
    MappedClasses(MappedClassesReport),
    CoreInsert(CoreInsertReport),
    CoreAsync(CoreAsyncReport),
    OrmAsync(OrmAsyncReport),
}

impl Report {
    pub fn script(&self) -> ScriptName {
        match self {
            Report::Hello(_) => ScriptName::Hello,
            Report::Dbapi(_) => ScriptName::Dbapi,
            Report::MappedClasses(_) => ScriptName::MappedClasses,
            Report::CoreInsert(_) => ScriptName::CoreInsert,
            Report::CoreAsync(_) => ScriptName::CoreAsync,
            Report::OrmAsync(_) => ScriptName::OrmAsync,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Hello(r) => r.fmt(f),
            Report::Dbapi(r) => r.fmt(f),
            Report::MappedClasses(r) => r.fmt(f),
            Report::CoreInsert(r) => r.fmt(f),
            Report::CoreAsync(r) => r.fmt(f),
            Report::OrmAsync(r) => r.fmt(f),
        }
    }
}

/// Run one script, or every script in order for [`ScriptName::All`].
///
/// The first failing script stops the run.
pub async fn run(engine: &Engine, name: ScriptName) -> StoreResult<Vec<Report>> {
    let names: Vec<ScriptName> = match name {
        ScriptName::All => ScriptName::SEQUENCE.to_vec(),
        single => vec![single],
    };

    let mut reports = Vec::with_capacity(names.len());
    for name in names {
        info!(script = %name, "running script");
        let report = match name {
            ScriptName::Hello => Report::Hello(hello::run(engine).await?),
            ScriptName::Dbapi => Report::Dbapi(dbapi::run(engine).await?),
            ScriptName::MappedClasses => Report::MappedClasses(mapped_classes::run(engine).await?),
            ScriptName::CoreInsert => Report::CoreInsert(core_insert::run(engine).await?),
            ScriptName::CoreAsync => Report::CoreAsync(core_async::run(engine).await?),
            ScriptName::OrmAsync => Report::OrmAsync(orm_async::run(engine).await?),
            ScriptName::All => continue,
        };
        reports.push(report);
    }
    Ok(reports)
}

/// Drop then create every table in `metadata`.
pub(crate) async fn fresh_schema(engine: &Engine, metadata: &Metadata) -> StoreResult<()> {
    engine.drop_all(metadata).await?;
    engine.create_all(metadata).await
}
