//! Scope, repository and text-SQL behaviour against in-memory SQLite.

use std::io;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use sqltour_core::{catalog, params, NewA, NewB, NewUser, Params, StoreConfig, TourError, Value};
use sqltour_store::{
    AddressRepo, Engine, NameRepo, ParentRepo, StoreError, TextQuery, UserRepo,
};
use tracing::instrument::WithSubscriber;

async fn memory_engine() -> Engine {
    Engine::connect(&StoreConfig::default())
        .await
        .expect("engine creation failed")
}

fn three_parents() -> Vec<NewA> {
    vec![
        NewA::new("a1", vec![NewB::new("b1"), NewB::new("b2")]),
        NewA::new("a2", vec![]),
        NewA::new("a3", vec![NewB::new("b3"), NewB::new("b4")]),
    ]
}

#[tokio::test]
async fn insert_then_get_returns_equal_fields() {
    let engine = memory_engine().await;
    engine.create_all(&catalog::user_address()).await.unwrap();

    let id = engine
        .transaction(|scope| {
            Box::pin(async move {
                UserRepo::new(scope)
                    .insert(&NewUser::new("spongebob", "Spongebob Squarepants"))
                    .await
            })
        })
        .await
        .unwrap();

    let mut scope = engine.begin().await.unwrap();
    let mut repo = UserRepo::new(&mut scope);
    let user = repo.get(id).await.unwrap();
    assert_eq!(user.id, id);
    assert_eq!(user.name, "spongebob");
    assert_eq!(user.fullname.as_deref(), Some("Spongebob Squarepants"));

    let by_name = repo.find_by_name("spongebob").await.unwrap().unwrap();
    assert_eq!(by_name, user);
    assert!(repo.find_by_name("squidward").await.unwrap().is_none());

    let missing = repo.get(id + 100).await.unwrap_err();
    assert!(matches!(missing, StoreError::NotFound { resource: "user", .. }));
    scope.commit().await.unwrap();

    engine.dispose().await;
}

#[tokio::test]
async fn failed_scope_leaves_store_unchanged() {
    let engine = memory_engine().await;
    engine.create_all(&catalog::parent_child()).await.unwrap();

    let result: Result<(), StoreError> = engine
        .transaction(|scope| {
            Box::pin(async move {
                let inserted = ParentRepo::new(scope).insert_all(&three_parents()).await?;
                assert_eq!(inserted.len(), 3);
                Err(StoreError::not_found("a", "abort"))
            })
        })
        .await;
    assert!(matches!(result, Err(StoreError::NotFound { .. })));

    let mut scope = engine.begin().await.unwrap();
    let mut repo = ParentRepo::new(&mut scope);
    assert_eq!(repo.count().await.unwrap(), 0);
    assert_eq!(repo.count_children().await.unwrap(), 0);
    scope.commit().await.unwrap();

    engine.dispose().await;
}

#[tokio::test]
async fn constraint_violation_rolls_back_whole_scope() {
    let engine = memory_engine().await;
    engine.create_all(&catalog::parent_child()).await.unwrap();

    let result = engine
        .transaction(|scope| {
            Box::pin(async move {
                let mut repo = ParentRepo::new(scope);
                repo.insert_all(&three_parents()).await?;
                // no parent 9999: the foreign key rejects the child
                repo.insert_child(9999, &NewB::new("orphan")).await
            })
        })
        .await;
    assert!(matches!(result, Err(StoreError::Query(_))));

    let mut scope = engine.begin().await.unwrap();
    assert_eq!(ParentRepo::new(&mut scope).count().await.unwrap(), 0);
    scope.commit().await.unwrap();

    engine.dispose().await;
}

#[tokio::test]
async fn dropped_scope_rolls_back() {
    let engine = memory_engine().await;
    engine.create_all(&catalog::t1()).await.unwrap();

    {
        let mut scope = engine.begin().await.unwrap();
        let inserted = NameRepo::new(&mut scope)
            .insert_many(&["never committed"])
            .await
            .unwrap();
        assert_eq!(inserted, 1);
    }

    let mut scope = engine.begin().await.unwrap();
    let found = NameRepo::new(&mut scope)
        .find("never committed")
        .await
        .unwrap();
    assert!(found.is_empty());
    scope.commit().await.unwrap();

    engine.dispose().await;
}

#[tokio::test]
async fn filter_returns_exactly_matching_rows() {
    let engine = memory_engine().await;
    engine.create_all(&catalog::some_table()).await.unwrap();

    let mut conn = engine.connection().await.unwrap();
    let rows = [(1, 1), (2, 4), (3, 2), (6, 8), (9, 10), (7, -3)];
    let sets: Vec<Params> = rows
        .iter()
        .map(|(x, y)| params! { "x" => *x, "y" => *y })
        .collect();
    let written = conn
        .execute_many(
            &TextQuery::new("INSERT INTO some_table (x, y) VALUES (:x, :y)"),
            &sets,
        )
        .await
        .unwrap();
    assert_eq!(written, rows.len() as u64);

    let fetched = conn
        .fetch_all(
            &TextQuery::new("SELECT x, y FROM some_table WHERE y > :y ORDER BY x"),
            &params! { "y" => 2 },
        )
        .await
        .unwrap();

    let got: Vec<(i64, i64)> = fetched
        .iter()
        .map(|r| (r.int("x").unwrap(), r.int("y").unwrap()))
        .collect();
    let mut expected: Vec<(i64, i64)> = rows
        .iter()
        .filter(|(_, y)| *y > 2)
        .map(|(x, y)| (i64::from(*x), i64::from(*y)))
        .collect();
    expected.sort();
    assert_eq!(got, expected);
    drop(conn);

    engine.dispose().await;
}

#[tokio::test]
async fn missing_param_fails_before_store() {
    let engine = memory_engine().await;
    engine.create_all(&catalog::some_table()).await.unwrap();

    let mut scope = engine.begin().await.unwrap();
    let insert = TextQuery::new("INSERT INTO some_table (x, y) VALUES (:x, :y)");
    // the second set is incomplete, so neither statement runs
    let err = scope
        .execute_many(&insert, &[params! { "x" => 1, "y" => 1 }, params! { "x" => 2 }])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingParam(ref name) if name == "y"));

    let rows = scope
        .fetch_all(&TextQuery::new("SELECT x FROM some_table"), &Params::new())
        .await
        .unwrap();
    assert!(rows.is_empty());
    scope.rollback().await.unwrap();

    engine.dispose().await;
}

#[tokio::test]
async fn null_param_binds_into_integer_column() {
    let engine = memory_engine().await;
    engine.create_all(&catalog::some_table()).await.unwrap();

    let mut conn = engine.connection().await.unwrap();
    let written = conn
        .execute(
            &TextQuery::new("INSERT INTO some_table (x, y) VALUES (:x, :y)"),
            &params! { "x" => 1, "y" => Value::Null },
        )
        .await
        .unwrap();
    assert_eq!(written, 1);

    let rows = conn
        .fetch_all(
            &TextQuery::new("SELECT x, y FROM some_table WHERE y IS NULL"),
            &Params::new(),
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].int("x"), Some(1));
    assert_eq!(rows[0].get("y"), Some(&Value::Null));
    drop(conn);

    engine.dispose().await;
}

#[tokio::test]
async fn bulk_insert_then_count() {
    let engine = memory_engine().await;
    engine.create_all(&catalog::user_address()).await.unwrap();

    const N: usize = 25;
    let users: Vec<NewUser> = (0..N)
        .map(|i| NewUser::new(format!("user{i}"), format!("User Number {i}")))
        .collect();

    let ids = engine
        .transaction(|scope| {
            Box::pin(async move { UserRepo::new(scope).insert_many(&users).await })
        })
        .await
        .unwrap();
    assert_eq!(ids.len(), N);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    let mut scope = engine.begin().await.unwrap();
    assert_eq!(UserRepo::new(&mut scope).count().await.unwrap(), N as i64);
    scope.commit().await.unwrap();

    engine.dispose().await;
}

#[tokio::test]
async fn update_commit_then_reread() {
    let engine = memory_engine().await;
    engine.create_all(&catalog::parent_child()).await.unwrap();

    let parents = engine
        .transaction(|scope| {
            Box::pin(async move { ParentRepo::new(scope).insert_all(&three_parents()).await })
        })
        .await
        .unwrap();
    let target = parents[1].id;

    engine
        .transaction(move |scope| {
            Box::pin(async move { ParentRepo::new(scope).update_data(target, "new data").await })
        })
        .await
        .unwrap();

    let mut scope = engine.begin().await.unwrap();
    let mut repo = ParentRepo::new(&mut scope);
    assert_eq!(repo.get(target).await.unwrap().data, "new data");
    assert_eq!(repo.get(parents[0].id).await.unwrap().data, "a1");

    let err = repo.update_data(target + 100, "nobody").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { resource: "a", .. }));
    scope.rollback().await.unwrap();

    engine.dispose().await;
}

#[tokio::test]
async fn unloaded_relationship_is_detached() {
    let engine = memory_engine().await;
    engine.create_all(&catalog::parent_child()).await.unwrap();
    engine
        .transaction(|scope| {
            Box::pin(async move { ParentRepo::new(scope).insert_all(&three_parents()).await })
        })
        .await
        .unwrap();

    let mut scope = engine.begin().await.unwrap();
    let mut repo = ParentRepo::new(&mut scope);
    let mut first = repo.first().await.unwrap().unwrap();
    let untouched = repo.get(first.id).await.unwrap();

    repo.load_children(&mut first).await.unwrap();
    scope.commit().await.unwrap();

    assert_eq!(first.bs().unwrap().len(), 2);
    let err = untouched.bs().unwrap_err();
    assert!(matches!(
        err,
        TourError::DetachedAccess {
            entity: "A",
            relation: "bs"
        }
    ));
    assert!(StoreError::from(err).is_detached());

    engine.dispose().await;
}

#[tokio::test]
async fn list_with_children_groups_by_parent() {
    let engine = memory_engine().await;
    engine.create_all(&catalog::parent_child()).await.unwrap();

    let mut scope = engine.begin().await.unwrap();
    let mut repo = ParentRepo::new(&mut scope);
    let inserted = repo.insert_all(&three_parents()).await.unwrap();
    let listed = repo.list_with_children().await.unwrap();

    let counts: Vec<usize> = listed.iter().map(|a| a.bs().unwrap().len()).collect();
    assert_eq!(counts, vec![2, 0, 2]);
    for (got, written) in listed.iter().zip(&inserted) {
        assert_eq!(got.bs().unwrap(), written.bs().unwrap());
        assert!(got.bs().unwrap().iter().all(|b| b.a_id == got.id));
    }

    let later = repo.children_matching(inserted[0].bs().unwrap()[1].id).await.unwrap();
    let data: Vec<&str> = later.iter().map(|b| b.data.as_str()).collect();
    assert_eq!(data, ["b3", "b4"]);
    scope.commit().await.unwrap();

    engine.dispose().await;
}

#[tokio::test]
async fn create_date_assigned_by_store() {
    let engine = memory_engine().await;
    engine.create_all(&catalog::parent_child()).await.unwrap();

    let before = Utc::now();
    let parent = engine
        .transaction(|scope| {
            Box::pin(async move { ParentRepo::new(scope).insert(&NewA::new("dated", vec![])).await })
        })
        .await
        .unwrap();

    // CURRENT_TIMESTAMP has second precision
    let drift = (parent.create_date - before).num_seconds().abs();
    assert!(drift <= 60, "create_date {} too far from {}", parent.create_date, before);

    engine.dispose().await;
}

#[tokio::test]
async fn address_inserts_follow_users() {
    let engine = memory_engine().await;
    engine.create_all(&catalog::user_address()).await.unwrap();

    let mut scope = engine.begin().await.unwrap();
    let sandy = UserRepo::new(&mut scope)
        .insert(&NewUser::new("sandy", "Sandy Cheeks"))
        .await
        .unwrap();
    UserRepo::new(&mut scope)
        .insert(&NewUser {
            name: "gary".into(),
            fullname: None,
        })
        .await
        .unwrap();

    let mut addresses = AddressRepo::new(&mut scope);
    addresses
        .insert_for_username("sandy", "sandy@sqlalchemy.org")
        .await
        .unwrap();
    // users without a fullname are skipped
    assert_eq!(addresses.insert_from_select("@aol.com").await.unwrap(), 1);

    let emails: Vec<String> = addresses
        .list_for_user(sandy)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.email_address)
        .collect();
    assert_eq!(emails, ["sandy@sqlalchemy.org", "Sandy Cheeks@aol.com"]);
    scope.commit().await.unwrap();

    engine.dispose().await;
}

#[tokio::test]
async fn address_for_unknown_user_is_rejected() {
    let engine = memory_engine().await;
    engine.create_all(&catalog::user_address()).await.unwrap();

    let result = engine
        .transaction(|scope| {
            Box::pin(async move {
                AddressRepo::new(scope)
                    .insert_for_username("squidward", "squidward@krustykrab.com")
                    .await
            })
        })
        .await;
    assert!(matches!(result, Err(StoreError::Query(_))));

    engine.dispose().await;
}

#[tokio::test]
async fn duplicate_names_are_skipped() {
    let engine = memory_engine().await;
    engine.create_all(&catalog::t1()).await.unwrap();

    let mut scope = engine.begin().await.unwrap();
    let mut repo = NameRepo::new(&mut scope);
    assert_eq!(repo.insert_many(&["n", "n", "m"]).await.unwrap(), 2);
    assert_eq!(repo.find("n").await.unwrap(), vec!["n".to_string()]);
    scope.commit().await.unwrap();

    engine.dispose().await;
}

#[tokio::test]
async fn file_store_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("tour.db").display());

    let engine = Engine::connect(&StoreConfig::new(url.clone())).await.unwrap();
    engine.create_all(&catalog::t1()).await.unwrap();
    engine
        .transaction(|scope| {
            Box::pin(async move { NameRepo::new(scope).insert_many(&["kept"]).await })
        })
        .await
        .unwrap();
    engine.dispose().await;

    let engine = Engine::connect(&StoreConfig::new(url)).await.unwrap();
    let mut scope = engine.begin().await.unwrap();
    assert_eq!(NameRepo::new(&mut scope).find("kept").await.unwrap(), ["kept"]);
    scope.commit().await.unwrap();
    engine.dispose().await;
}

/// Log sink shared between a subscriber and the test body
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[tokio::test]
async fn only_failed_scopes_warn() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let sink = captured.clone();
    async move {
        let engine = memory_engine().await;

        let scope = engine.begin().await.unwrap();
        scope.rollback().await.unwrap();
        assert_eq!(sink.text(), "");

        let result: Result<(), StoreError> = engine
            .transaction(|_scope| Box::pin(async { Err(StoreError::not_found("a", "abort")) }))
            .await;
        assert!(result.is_err());
        assert!(sink.text().contains("scope failed"));

        engine.dispose().await;
    }
    .with_subscriber(subscriber)
    .await;
}
