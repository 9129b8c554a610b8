//! Declared tables used by the tour scripts.

use crate::schema::{Column, ColumnType, Metadata, Relationship, ServerDefault, Table};

pub const USER_TABLE: &str = "user_account";
pub const ADDRESS_TABLE: &str = "address";
pub const PARENT_TABLE: &str = "a";
pub const CHILD_TABLE: &str = "b";
pub const SOME_TABLE: &str = "some_table";
pub const NAME_TABLE: &str = "t1";

/// `user_account` ↔ `address`, one user to many addresses.
pub fn user_address() -> Metadata {
    Metadata::new()
        .with_table(
            Table::new(USER_TABLE)
                .with_column(Column::new("id", ColumnType::Integer).primary_key())
                .with_column(Column::new("name", ColumnType::VarChar(30)))
                .with_column(Column::new("fullname", ColumnType::Text))
                .with_relationship(
                    Relationship::one_to_many("addresses", ADDRESS_TABLE).back_populates("user"),
                ),
        )
        .with_table(
            Table::new(ADDRESS_TABLE)
                .with_column(Column::new("id", ColumnType::Integer).primary_key())
                .with_column(Column::new("email_address", ColumnType::Text).not_null())
                .with_column(
                    Column::new("user_id", ColumnType::Integer)
                        .not_null()
                        .references(USER_TABLE, "id"),
                )
                .with_relationship(
                    Relationship::many_to_one("user", USER_TABLE).back_populates("addresses"),
                ),
        )
}

/// `a` ↔ `b`; `a.create_date` is filled in by the store.
pub fn parent_child() -> Metadata {
    Metadata::new()
        .with_table(
            Table::new(PARENT_TABLE)
                .with_column(Column::new("id", ColumnType::Integer).primary_key())
                .with_column(Column::new("data", ColumnType::Text).not_null())
                .with_column(
                    Column::new("create_date", ColumnType::Timestamp)
                        .not_null()
                        .server_default(ServerDefault::CurrentTimestamp),
                )
                .with_relationship(Relationship::one_to_many("bs", CHILD_TABLE)),
        )
        .with_table(
            Table::new(CHILD_TABLE)
                .with_column(Column::new("id", ColumnType::Integer).primary_key())
                .with_column(
                    Column::new("a_id", ColumnType::Integer)
                        .not_null()
                        .references(PARENT_TABLE, "id"),
                )
                .with_column(Column::new("data", ColumnType::Text).not_null()),
        )
}

/// Bare `(x, y)` table for the raw SQL walkthrough; no key, duplicates allowed.
pub fn some_table() -> Metadata {
    Metadata::new().with_table(
        Table::new(SOME_TABLE)
            .with_column(Column::new("x", ColumnType::Integer))
            .with_column(Column::new("y", ColumnType::Integer)),
    )
}

pub fn t1() -> Metadata {
    Metadata::new().with_table(
        Table::new(NAME_TABLE).with_column(Column::new("name", ColumnType::VarChar(50)).primary_key()),
    )
}

/// Every catalog by name, in the order the CLI lists them.
pub fn all() -> Vec<(&'static str, Metadata)> {
    vec![
        ("user-address", user_address()),
        ("parent-child", parent_child()),
        ("some-table", some_table()),
        ("t1", t1()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Dialect;

    #[test]
    fn test_catalogs_validate() {
        for (name, meta) in all() {
            assert!(meta.validate().is_ok(), "catalog {name} should validate");
        }
    }

    #[test]
    fn test_user_address_order() {
        let meta = user_address();
        let names: Vec<&str> = meta
            .sorted_tables()
            .unwrap()
            .into_iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec![USER_TABLE, ADDRESS_TABLE]);
    }

    #[test]
    fn test_user_name_is_nullable() {
        let ddl = user_address().create_all_ddl(Dialect::Sqlite).unwrap();
        assert!(ddl[0].contains(r#""name" VARCHAR(30), "#));
        assert!(ddl[1].contains(r#""email_address" TEXT NOT NULL"#));
    }

    #[test]
    fn test_some_table_is_keyless() {
        let ddl = some_table().create_all_ddl(Dialect::Postgres).unwrap();
        assert_eq!(
            ddl[0],
            r#"CREATE TABLE IF NOT EXISTS "some_table" ("x" BIGINT, "y" BIGINT)"#
        );
    }
}
