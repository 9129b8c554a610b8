//! Parent repository (`a` with children in `b`)
//!
//! Children are never fetched behind the caller's back. Use
//! `load_children_of` / `load_children` for one parent, or
//! `list_with_children` to fill every parent with a single IN query.

use std::collections::HashMap;

use sqlx::any::AnyRow;
use sqlx::Row;

use sqltour_core::{parse_timestamp, NewA, NewB, Related, Value, A, B};

use crate::error::{StoreError, StoreResult};
use crate::scope::Scope;

const PARENT_COLUMNS: &str = "id, data, CAST(create_date AS TEXT) AS create_date";

fn parent_from_row(row: &AnyRow) -> StoreResult<A> {
    let create_date: String = row.try_get("create_date")?;
    Ok(A {
        id: row.try_get("id")?,
        data: row.try_get("data")?,
        create_date: parse_timestamp(&create_date)?,
        bs: Related::Unloaded,
    })
}

fn child_from_row(row: &AnyRow) -> StoreResult<B> {
    Ok(B {
        id: row.try_get("id")?,
        a_id: row.try_get("a_id")?,
        data: row.try_get("data")?,
    })
}

pub struct ParentRepo<'a> {
    scope: &'a mut Scope,
}

impl<'a> ParentRepo<'a> {
    pub fn new(scope: &'a mut Scope) -> Self {
        Self { scope }
    }

    /// Insert a parent and its children. The returned parent has its
    /// children loaded, since this scope just wrote them.
    pub async fn insert(&mut self, new: &NewA) -> StoreResult<A> {
        let sql = format!("INSERT INTO a (data) VALUES ($1) RETURNING {PARENT_COLUMNS}");
        self.scope.trace(&sql, &[Value::from(new.data.as_str())]);
        let row = sqlx::query(&sql)
            .bind(new.data.clone())
            .fetch_one(self.scope.conn())
            .await?;
        let mut parent = parent_from_row(&row)?;

        let mut children = Vec::with_capacity(new.bs.len());
        for child in &new.bs {
            children.push(self.insert_child(parent.id, child).await?);
        }
        parent.bs = Related::Loaded(children);
        Ok(parent)
    }

    pub async fn insert_all(&mut self, parents: &[NewA]) -> StoreResult<Vec<A>> {
        let mut inserted = Vec::with_capacity(parents.len());
        for new in parents {
            inserted.push(self.insert(new).await?);
        }
        Ok(inserted)
    }

    pub async fn insert_child(&mut self, a_id: i64, child: &NewB) -> StoreResult<B> {
        const SQL: &str = "INSERT INTO b (a_id, data) VALUES ($1, $2) RETURNING id, a_id, data";
        self.scope
            .trace(SQL, &[Value::Int(a_id), Value::from(child.data.as_str())]);
        let row = sqlx::query(SQL)
            .bind(a_id)
            .bind(child.data.clone())
            .fetch_one(self.scope.conn())
            .await?;
        child_from_row(&row)
    }

    pub async fn get(&mut self, id: i64) -> StoreResult<A> {
        let sql = format!("SELECT {PARENT_COLUMNS} FROM a WHERE id = $1");
        self.scope.trace(&sql, &[Value::Int(id)]);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.scope.conn())
            .await?
            .ok_or_else(|| StoreError::not_found("a", id))?;
        parent_from_row(&row)
    }

    /// Every parent by id, children unloaded.
    pub async fn list(&mut self) -> StoreResult<Vec<A>> {
        let sql = format!("SELECT {PARENT_COLUMNS} FROM a ORDER BY id");
        self.scope.trace(&sql, &[]);
        let rows = sqlx::query(&sql).fetch_all(self.scope.conn()).await?;
        rows.iter().map(parent_from_row).collect()
    }

    /// Parent with the lowest id, if any.
    pub async fn first(&mut self) -> StoreResult<Option<A>> {
        let sql = format!("SELECT {PARENT_COLUMNS} FROM a ORDER BY id LIMIT 1");
        self.scope.trace(&sql, &[]);
        let row = sqlx::query(&sql)
            .fetch_optional(self.scope.conn())
            .await?;
        row.as_ref().map(parent_from_row).transpose()
    }

    /// Set `data` on one parent; NotFound when no row matched.
    pub async fn update_data(&mut self, id: i64, data: &str) -> StoreResult<()> {
        const SQL: &str = "UPDATE a SET data = $1 WHERE id = $2";
        self.scope.trace(SQL, &[Value::from(data), Value::Int(id)]);
        let result = sqlx::query(SQL)
            .bind(data.to_string())
            .bind(id)
            .execute(self.scope.conn())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("a", id));
        }
        Ok(())
    }

    pub async fn load_children_of(&mut self, parent_id: i64) -> StoreResult<Vec<B>> {
        const SQL: &str = "SELECT id, a_id, data FROM b WHERE a_id = $1 ORDER BY id";
        self.scope.trace(SQL, &[Value::Int(parent_id)]);
        let rows = sqlx::query(SQL)
            .bind(parent_id)
            .fetch_all(self.scope.conn())
            .await?;
        rows.iter().map(child_from_row).collect()
    }

    pub async fn load_children(&mut self, parent: &mut A) -> StoreResult<()> {
        let children = self.load_children_of(parent.id).await?;
        parent.bs = Related::Loaded(children);
        Ok(())
    }

    /// Every parent with children loaded: one query for parents, one for all children.
    pub async fn list_with_children(&mut self) -> StoreResult<Vec<A>> {
        let mut parents = self.list().await?;
        if parents.is_empty() {
            return Ok(parents);
        }

        let placeholders: Vec<String> = (1..=parents.len()).map(|i| format!("${i}")).collect();
        let sql = format!(
            "SELECT id, a_id, data FROM b WHERE a_id IN ({}) ORDER BY a_id, id",
            placeholders.join(", ")
        );
        let ids: Vec<Value> = parents.iter().map(|p| Value::Int(p.id)).collect();
        self.scope.trace(&sql, &ids);

        let mut query = sqlx::query(&sql);
        for parent in &parents {
            query = query.bind(parent.id);
        }
        let rows = query.fetch_all(self.scope.conn()).await?;

        let mut by_parent: HashMap<i64, Vec<B>> = HashMap::new();
        for row in &rows {
            let child = child_from_row(row)?;
            by_parent.entry(child.a_id).or_default().push(child);
        }
        for parent in &mut parents {
            parent.bs = Related::Loaded(by_parent.remove(&parent.id).unwrap_or_default());
        }
        Ok(parents)
    }

    /// Children with an id strictly greater than `min_id`, across all parents.
    pub async fn children_matching(&mut self, min_id: i64) -> StoreResult<Vec<B>> {
        const SQL: &str = "SELECT id, a_id, data FROM b WHERE id > $1 ORDER BY id";
        self.scope.trace(SQL, &[Value::Int(min_id)]);
        let rows = sqlx::query(SQL)
            .bind(min_id)
            .fetch_all(self.scope.conn())
            .await?;
        rows.iter().map(child_from_row).collect()
    }

    pub async fn count(&mut self) -> StoreResult<i64> {
        const SQL: &str = "SELECT COUNT(*) FROM a";
        self.scope.trace(SQL, &[]);
        Ok(sqlx::query_scalar(SQL).fetch_one(self.scope.conn()).await?)
    }

    pub async fn count_children(&mut self) -> StoreResult<i64> {
        const SQL: &str = "SELECT COUNT(*) FROM b";
        self.scope.trace(SQL, &[]);
        Ok(sqlx::query_scalar(SQL).fetch_one(self.scope.conn()).await?)
    }
}
