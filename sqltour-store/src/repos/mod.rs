//! Repository implementations for the tour entities
//!
//! Each repository borrows an open [`Scope`](crate::Scope), so every read and
//! write it issues belongs to that scope's transaction:
//! - Inserts use `RETURNING` to hand back store-assigned keys and defaults
//! - Relationships are loaded only by explicit calls (no lazy proxies)
//! - Integrity is left to store constraints; violations surface as `StoreError::Query`

pub mod addresses;
pub mod names;
pub mod parents;
pub mod users;

pub use addresses::AddressRepo;
pub use names::NameRepo;
pub use parents::ParentRepo;
pub use users::UserRepo;
