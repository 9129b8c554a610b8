//! Declarative table metadata and DDL rendering
//!
//! Tables are declared once as plain values and rendered to store-native
//! `CREATE TABLE` / `DROP TABLE` statements per [`Dialect`]. Relationships are
//! descriptive only: they document the one-to-many pairs and are checked for
//! dangling targets, but never produce SQL.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Result, TourError};

/// Backing store flavour, used for type mapping and URL resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgres => "postgres",
        }
    }

    /// Quote an identifier. Both stores accept ANSI double quotes.
    pub fn quote(self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn type_name(self, ty: ColumnType) -> String {
        match (self, ty) {
            (Dialect::Sqlite, ColumnType::Integer) => "INTEGER".to_string(),
            (Dialect::Postgres, ColumnType::Integer) => "BIGINT".to_string(),
            (_, ColumnType::Text) => "TEXT".to_string(),
            (_, ColumnType::VarChar(len)) => format!("VARCHAR({len})"),
            (Dialect::Sqlite, ColumnType::Timestamp) => "TIMESTAMP".to_string(),
            (Dialect::Postgres, ColumnType::Timestamp) => "TIMESTAMPTZ".to_string(),
        }
    }

    /// Column definition for an autoincrementing integer primary key.
    fn serial_primary_key(self) -> &'static str {
        match self {
            Dialect::Sqlite => "INTEGER PRIMARY KEY",
            Dialect::Postgres => "BIGSERIAL PRIMARY KEY",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = TourError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Dialect::Sqlite),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            other => Err(TourError::UnknownDialect {
                scheme: other.to_string(),
            }),
        }
    }
}

/// Semantic column type. Integers are always 64-bit on the store side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    VarChar(u32),
    Timestamp,
}

/// Value the store assigns when the insert omits the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerDefault {
    CurrentTimestamp,
}

impl ServerDefault {
    fn sql(self) -> &'static str {
        match self {
            ServerDefault::CurrentTimestamp => "CURRENT_TIMESTAMP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
    pub foreign_key: Option<ForeignKey>,
    pub server_default: Option<ServerDefault>,
}

impl Column {
    /// Nullable, non-key column.
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
            primary_key: false,
            foreign_key: None,
            server_default: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key = Some(ForeignKey {
            table: table.into(),
            column: column.into(),
        });
        self
    }

    pub fn server_default(mut self, default: ServerDefault) -> Self {
        self.server_default = Some(default);
        self
    }

    fn definition(&self, dialect: Dialect, sole_primary_key: bool) -> String {
        let mut def = dialect.quote(&self.name);
        def.push(' ');

        if sole_primary_key && self.ty == ColumnType::Integer {
            def.push_str(dialect.serial_primary_key());
            return def;
        }

        def.push_str(&dialect.type_name(self.ty));
        if sole_primary_key {
            def.push_str(" PRIMARY KEY");
        } else if !self.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = self.server_default {
            def.push_str(" DEFAULT ");
            def.push_str(default.sql());
        }
        if let Some(fk) = &self.foreign_key {
            def.push_str(&format!(
                " REFERENCES {} ({})",
                dialect.quote(&fk.table),
                dialect.quote(&fk.column)
            ));
        }
        def
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    OneToMany,
    ManyToOne,
}

/// Named association between two declared tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub name: String,
    pub target: String,
    pub kind: RelationKind,
    pub back_populates: Option<String>,
}

impl Relationship {
    pub fn one_to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            kind: RelationKind::OneToMany,
            back_populates: None,
        }
    }

    pub fn many_to_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            kind: RelationKind::ManyToOne,
            back_populates: None,
        }
    }

    pub fn back_populates(mut self, name: impl Into<String>) -> Self {
        self.back_populates = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub relationships: Vec<Relationship>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    /// Tables this one points at through foreign keys, self-references excluded.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter_map(|c| c.foreign_key.as_ref())
            .map(|fk| fk.table.as_str())
            .filter(move |t| *t != self.name)
    }

    pub fn create_ddl(&self, dialect: Dialect) -> String {
        let pk_count = self.primary_key().len();
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.definition(dialect, c.primary_key && pk_count == 1))
            .collect();

        if pk_count > 1 {
            let cols: Vec<String> = self
                .primary_key()
                .iter()
                .map(|c| dialect.quote(&c.name))
                .collect();
            parts.push(format!("PRIMARY KEY ({})", cols.join(", ")));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            dialect.quote(&self.name),
            parts.join(", ")
        )
    }

    pub fn drop_ddl(&self, dialect: Dialect) -> String {
        format!("DROP TABLE IF EXISTS {}", dialect.quote(&self.name))
    }
}

/// Ordered registry of declared tables, consumed by create-all / drop-all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    tables: Vec<Table>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Check for duplicate tables, dangling foreign keys and relationship targets.
    pub fn validate(&self) -> Result<()> {
        for (i, table) in self.tables.iter().enumerate() {
            if self.tables[..i].iter().any(|t| t.name == table.name) {
                return Err(TourError::schema(&table.name, "declared more than once"));
            }
            for column in &table.columns {
                let Some(fk) = &column.foreign_key else {
                    continue;
                };
                let target = self.table(&fk.table).ok_or_else(|| {
                    TourError::schema(
                        &table.name,
                        format!("unknown foreign key target table '{}'", fk.table),
                    )
                })?;
                if target.column(&fk.column).is_none() {
                    return Err(TourError::schema(
                        &table.name,
                        format!("unknown foreign key target column '{}.{}'", fk.table, fk.column),
                    ));
                }
            }
            for rel in &table.relationships {
                if self.table(&rel.target).is_none() {
                    return Err(TourError::schema(
                        &table.name,
                        format!("relationship '{}' targets unknown table '{}'", rel.name, rel.target),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Tables in foreign-key dependency order; ties keep declaration order.
    pub fn sorted_tables(&self) -> Result<Vec<&Table>> {
        self.validate()?;

        let mut emitted: Vec<&Table> = Vec::with_capacity(self.tables.len());
        let mut pending: Vec<&Table> = self.tables.iter().collect();

        while !pending.is_empty() {
            let ready = pending.iter().position(|table| {
                table
                    .dependencies()
                    .all(|dep| emitted.iter().any(|t| t.name == dep))
            });
            match ready {
                Some(idx) => emitted.push(pending.remove(idx)),
                None => {
                    return Err(TourError::schema(
                        &pending[0].name,
                        "foreign key cycle between tables",
                    ))
                }
            }
        }

        Ok(emitted)
    }

    pub fn create_all_ddl(&self, dialect: Dialect) -> Result<Vec<String>> {
        Ok(self
            .sorted_tables()?
            .into_iter()
            .map(|t| t.create_ddl(dialect))
            .collect())
    }

    pub fn drop_all_ddl(&self, dialect: Dialect) -> Result<Vec<String>> {
        Ok(self
            .sorted_tables()?
            .into_iter()
            .rev()
            .map(|t| t.drop_ddl(dialect))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent_child() -> Metadata {
        // child first on purpose: ordering must come from the foreign key
        Metadata::new()
            .with_table(
                Table::new("child")
                    .with_column(Column::new("id", ColumnType::Integer).primary_key())
                    .with_column(
                        Column::new("parent_id", ColumnType::Integer)
                            .not_null()
                            .references("parent", "id"),
                    ),
            )
            .with_table(
                Table::new("parent")
                    .with_column(Column::new("id", ColumnType::Integer).primary_key())
                    .with_column(
                        Column::new("created", ColumnType::Timestamp)
                            .not_null()
                            .server_default(ServerDefault::CurrentTimestamp),
                    )
                    .with_relationship(Relationship::one_to_many("children", "child")),
            )
    }

    #[test]
    fn test_sqlite_ddl() {
        let ddl = parent_child().create_all_ddl(Dialect::Sqlite).unwrap();
        assert_eq!(
            ddl,
            vec![
                r#"CREATE TABLE IF NOT EXISTS "parent" ("id" INTEGER PRIMARY KEY, "created" TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)"#,
                r#"CREATE TABLE IF NOT EXISTS "child" ("id" INTEGER PRIMARY KEY, "parent_id" INTEGER NOT NULL REFERENCES "parent" ("id"))"#,
            ]
        );
    }

    #[test]
    fn test_postgres_ddl() {
        let ddl = parent_child().create_all_ddl(Dialect::Postgres).unwrap();
        assert!(ddl[0].contains(r#""id" BIGSERIAL PRIMARY KEY"#));
        assert!(ddl[0].contains("TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP"));
        assert!(ddl[1].contains(r#""parent_id" BIGINT NOT NULL REFERENCES"#));
    }

    #[test]
    fn test_drop_order_is_reversed() {
        let ddl = parent_child().drop_all_ddl(Dialect::Sqlite).unwrap();
        assert_eq!(
            ddl,
            vec![
                r#"DROP TABLE IF EXISTS "child""#,
                r#"DROP TABLE IF EXISTS "parent""#,
            ]
        );
    }

    #[test]
    fn test_non_integer_primary_key() {
        let table = Table::new("t1")
            .with_column(Column::new("name", ColumnType::VarChar(50)).primary_key());
        assert_eq!(
            table.create_ddl(Dialect::Postgres),
            r#"CREATE TABLE IF NOT EXISTS "t1" ("name" VARCHAR(50) PRIMARY KEY)"#
        );
    }

    #[test]
    fn test_composite_primary_key() {
        let table = Table::new("pair")
            .with_column(Column::new("x", ColumnType::Integer).primary_key())
            .with_column(Column::new("y", ColumnType::Integer).primary_key());
        assert_eq!(
            table.create_ddl(Dialect::Sqlite),
            r#"CREATE TABLE IF NOT EXISTS "pair" ("x" INTEGER NOT NULL, "y" INTEGER NOT NULL, PRIMARY KEY ("x", "y"))"#
        );
    }

    #[test]
    fn test_unknown_foreign_key_target() {
        let meta = Metadata::new().with_table(
            Table::new("address")
                .with_column(Column::new("id", ColumnType::Integer).primary_key())
                .with_column(Column::new("user_id", ColumnType::Integer).references("users", "id")),
        );
        let err = meta.create_all_ddl(Dialect::Sqlite).unwrap_err();
        assert!(err.to_string().contains("unknown foreign key target table 'users'"));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let meta = Metadata::new()
            .with_table(
                Table::new("a")
                    .with_column(Column::new("id", ColumnType::Integer).primary_key())
                    .with_column(Column::new("b_id", ColumnType::Integer).references("b", "id")),
            )
            .with_table(
                Table::new("b")
                    .with_column(Column::new("id", ColumnType::Integer).primary_key())
                    .with_column(Column::new("a_id", ColumnType::Integer).references("a", "id")),
            );
        assert!(matches!(
            meta.sorted_tables(),
            Err(TourError::Schema { .. })
        ));
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let t = Table::new("t").with_column(Column::new("id", ColumnType::Integer).primary_key());
        let meta = Metadata::new().with_table(t.clone()).with_table(t);
        assert!(meta.validate().is_err());
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("postgresql".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("SQLite".parse::<Dialect>().unwrap(), Dialect::Sqlite);
        assert!("mysql".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(Dialect::Sqlite.quote(r#"we"ird"#), r#""we""ird""#);
    }
}
