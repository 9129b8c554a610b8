//! Parent/child walkthrough on `a` / `b`.
//!
//! Children are loaded explicitly while the scope is open; the re-read at the
//! end leaves them unloaded and shows the error raised when they are touched.

use std::fmt;

use serde::Serialize;

use sqltour_core::{catalog, NewA, NewB, A};

use crate::error::{StoreError, StoreResult};
use crate::pool::Engine;
use crate::repos::ParentRepo;

use super::fresh_schema;

#[derive(Debug, Clone, Serialize)]
pub struct OrmAsyncReport {
    pub inserted: Vec<A>,
    /// Every parent as read in the second scope, children loaded.
    pub listed: Vec<A>,
    pub updated_id: Option<i64>,
    /// Parents read after the update committed, children left unloaded.
    pub reread: Vec<A>,
    pub detached_error: Option<String>,
}

fn write_parent(f: &mut fmt::Formatter<'_>, a: &A) -> fmt::Result {
    writeln!(
        f,
        "A(id={}, data={}, create_date={})",
        a.id,
        a.data,
        a.create_date.format("%Y-%m-%d %H:%M:%S")
    )?;
    if let Ok(bs) = a.bs() {
        for b in bs {
            writeln!(f, "  B(id={}, a_id={}, data={})", b.id, b.a_id, b.data)?;
        }
    }
    Ok(())
}

impl fmt::Display for OrmAsyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "inserted {} parents", self.inserted.len())?;
        for a in &self.listed {
            write_parent(f, a)?;
        }
        if let Some(id) = self.updated_id {
            writeln!(f, "updated A(id={id}) to 'new data'")?;
        }
        for a in &self.reread {
            write_parent(f, a)?;
        }
        if let Some(err) = &self.detached_error {
            writeln!(f, "{err}")?;
        }
        Ok(())
    }
}

fn new_parents() -> Vec<NewA> {
    vec![
        NewA::new("a1", vec![NewB::new("a1 b1"), NewB::new("a1 b2")]),
        NewA::new("a2", vec![]),
        NewA::new("a3", vec![NewB::new("a3 b1"), NewB::new("a3 b2")]),
    ]
}

pub async fn run(engine: &Engine) -> StoreResult<OrmAsyncReport> {
    fresh_schema(engine, &catalog::parent_child()).await?;

    let parents = new_parents();
    let inserted = engine
        .transaction(|scope| {
            Box::pin(async move { ParentRepo::new(scope).insert_all(&parents).await })
        })
        .await?;

    let (listed, updated_id) = engine
        .transaction(|scope| {
            Box::pin(async move {
                let mut repo = ParentRepo::new(scope);
                let mut listed = repo.list().await?;
                for a in &mut listed {
                    repo.load_children(a).await?;
                }

                let updated_id = match repo.first().await? {
                    Some(first) => {
                        repo.update_data(first.id, "new data").await?;
                        Some(first.id)
                    }
                    None => None,
                };
                Ok::<_, StoreError>((listed, updated_id))
            })
        })
        .await?;

    let mut scope = engine.begin().await?;
    let reread = ParentRepo::new(&mut scope).list().await?;
    scope.commit().await?;

    let detached_error = reread
        .first()
        .and_then(|a| a.bs().err())
        .map(|err| err.to_string());

    Ok(OrmAsyncReport {
        inserted,
        listed,
        updated_id,
        reread,
        detached_error,
    })
}
