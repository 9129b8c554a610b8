pub mod catalog;
pub mod config;
pub mod entity;
pub mod error;
pub mod schema;
pub mod value;

pub use config::{StoreConfig, StoreUrl};
pub use entity::{Address, NewA, NewB, NewUser, Related, User, A, B};
pub use error::{Result, TourError};
pub use schema::{
    Column, ColumnType, Dialect, ForeignKey, Metadata, RelationKind, Relationship, ServerDefault, Table,
};
pub use value::{parse_timestamp, Params, Record, Value};
