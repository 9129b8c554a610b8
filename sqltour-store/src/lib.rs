//! sqltour-store: engine, transactional scopes and tour scripts
//!
//! Opens a pooled engine against SQLite or Postgres, runs work inside
//! transactional scopes, and drives the walkthrough scripts on top of the
//! repositories.

pub mod error;
pub mod pool;
pub mod repos;
pub mod scope;
pub mod scripts;
pub mod text;

pub use error::{StoreError, StoreResult};
pub use pool::Engine;
pub use repos::{AddressRepo, NameRepo, ParentRepo, UserRepo};
pub use scope::{Connection, Scope};
pub use scripts::{Report, ScriptName};
pub use text::TextQuery;
