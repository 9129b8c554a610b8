//! Entity shapes for the two parent/child pairs
//!
//! `New*` structs are what callers build in memory before a scope writes them;
//! the plain structs are what a scope hands back after reading. Relationships
//! start out [`Related::Unloaded`] and are only filled by an explicit
//! repository call made inside a scope.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, TourError};

/// Collection side of a one-to-many relationship.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Related<T> {
    Unloaded,
    Loaded(Vec<T>),
}

impl<T> Default for Related<T> {
    fn default() -> Self {
        Related::Unloaded
    }
}

impl<T> Related<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Related::Loaded(_))
    }

    /// Loaded items, or [`TourError::DetachedAccess`] if nothing was loaded.
    pub fn get(&self, entity: &'static str, relation: &'static str) -> Result<&[T]> {
        match self {
            Related::Loaded(items) => Ok(items),
            Related::Unloaded => Err(TourError::detached(entity, relation)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub fullname: Option<String>,
}

impl NewUser {
    pub fn new(name: impl Into<String>, fullname: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fullname: Some(fullname.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub fullname: Option<String>,
    pub addresses: Related<Address>,
}

impl User {
    pub fn addresses(&self) -> Result<&[Address]> {
        self.addresses.get("User", "addresses")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    pub id: i64,
    pub user_id: i64,
    pub email_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewB {
    pub data: String,
}

impl NewB {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }
}

/// Parent row plus the children to write alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewA {
    pub data: String,
    pub bs: Vec<NewB>,
}

impl NewA {
    pub fn new(data: impl Into<String>, bs: Vec<NewB>) -> Self {
        Self {
            data: data.into(),
            bs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct A {
    pub id: i64,
    pub data: String,
    pub create_date: DateTime<Utc>,
    pub bs: Related<B>,
}

impl A {
    pub fn bs(&self) -> Result<&[B]> {
        self.bs.get("A", "bs")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct B {
    pub id: i64,
    pub a_id: i64,
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent() -> A {
        A {
            id: 1,
            data: "a1".into(),
            create_date: Utc::now(),
            bs: Related::Unloaded,
        }
    }

    #[test]
    fn test_unloaded_relationship_is_detached() {
        let a = parent();
        let err = a.bs().unwrap_err();
        assert!(matches!(
            err,
            TourError::DetachedAccess {
                entity: "A",
                relation: "bs"
            }
        ));
    }

    #[test]
    fn test_loaded_empty_relationship_is_not_an_error() {
        let mut a = parent();
        a.bs = Related::Loaded(Vec::new());
        assert!(a.bs().unwrap().is_empty());
    }

    #[test]
    fn test_related_serializes_null_when_unloaded() {
        let user = User {
            id: 1,
            name: "sandy".into(),
            fullname: None,
            addresses: Related::Unloaded,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json["addresses"].is_null());
    }
}
