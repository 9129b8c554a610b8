use std::fmt;

use serde::Serialize;

use sqltour_core::{catalog, RelationKind};

use crate::error::StoreResult;
use crate::pool::Engine;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedClassesReport {
    /// Tables in the order they were created.
    pub tables: Vec<String>,
    pub ddl: Vec<String>,
    /// `table.relation -> target` lines.
    pub relationships: Vec<String>,
    pub dropped: bool,
}

impl fmt::Display for MappedClassesReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.ddl {
            writeln!(f, "{statement};")?;
        }
        for rel in &self.relationships {
            writeln!(f, "relationship {rel}")?;
        }
        writeln!(f, "tables created: {}", self.tables.join(", "))?;
        if self.dropped {
            writeln!(f, "tables dropped")?;
        }
        Ok(())
    }
}

/// Declare user/address, create the tables, report their DDL, drop them again.
pub async fn run(engine: &Engine) -> StoreResult<MappedClassesReport> {
    let metadata = catalog::user_address();
    let ddl = metadata.create_all_ddl(engine.dialect())?;
    let tables: Vec<String> = metadata
        .sorted_tables()?
        .iter()
        .map(|t| t.name.clone())
        .collect();

    let relationships = metadata
        .tables()
        .iter()
        .flat_map(|table| {
            table.relationships.iter().map(move |rel| {
                let arrow = match rel.kind {
                    RelationKind::OneToMany => "->*",
                    RelationKind::ManyToOne => "->",
                };
                match &rel.back_populates {
                    Some(back) => format!("{}.{} {arrow} {}.{back}", table.name, rel.name, rel.target),
                    None => format!("{}.{} {arrow} {}", table.name, rel.name, rel.target),
                }
            })
        })
        .collect();

    engine.create_all(&metadata).await?;
    engine.drop_all(&metadata).await?;

    Ok(MappedClassesReport {
        tables,
        ddl,
        relationships,
        dropped: true,
    })
}
