//! Compile → bind → execute through `Session` and `Table`.

mod common;

use common::{Call, ScriptedDriver};
use dbbind::prelude::*;

fn last_one(driver: &ScriptedDriver) -> (String, Vec<Value>) {
    driver
        .calls
        .iter()
        .rev()
        .find_map(|c| match c {
            Call::One { sql, params } => Some((sql.clone(), params.clone())),
            _ => None,
        })
        .unwrap()
}

fn last_many(driver: &ScriptedDriver) -> (String, Vec<Vec<Value>>) {
    driver
        .calls
        .iter()
        .rev()
        .find_map(|c| match c {
            Call::Many { sql, rows } => Some((sql.clone(), rows.clone())),
            _ => None,
        })
        .unwrap()
}

#[tokio::test]
async fn keyed_record_binds_in_placeholder_order() {
    let mut session = Session::new(ScriptedDriver::new());
    let n = session
        .execute("select :b, :a, :b from t", record! { "a" => 1, "b" => 2 })
        .await
        .unwrap();
    assert_eq!(n, 1);

    let (sql, params) = last_one(session.driver());
    assert_eq!(sql, "select ?, ?, ? from t");
    assert_eq!(params, [Value::Int(2), Value::Int(1), Value::Int(2)]);
}

#[tokio::test]
async fn driver_style_decides_the_native_sql() {
    let mut session = Session::new(ScriptedDriver::with_style(ParamStyle::Dollar));
    session
        .write("update t set a = :a where id = :id", record! { "id" => 7, "a" => "x" })
        .await
        .unwrap();

    let (sql, params) = last_one(session.driver());
    assert_eq!(sql, "update t set a = $1 where id = $2");
    assert_eq!(params, [Value::from("x"), Value::Int(7)]);
}

#[tokio::test]
async fn configured_style_overrides_the_driver() {
    let config = SessionConfig::new().param_style(ParamStyle::Named);
    let mut session = Session::with_config(ScriptedDriver::new(), config).unwrap();
    session
        .write("select :x, :y, :x", record! { "x" => 1, "y" => 2 })
        .await
        .unwrap();

    let (sql, params) = last_one(session.driver());
    assert_eq!(sql, "select :x, :y, :x");
    assert_eq!(params, [Value::Int(1), Value::Int(2)]);
}

#[tokio::test]
async fn batch_goes_through_the_executor() {
    let mut session = Session::new(ScriptedDriver::new());
    let rows = vec![
        record! { "id" => 1, "name" => "a" },
        record! { "id" => 2, "name" => "b", "extra" => true },
    ];
    let n = session
        .execute("insert into t values (:id, :name)", rows)
        .await
        .unwrap();
    assert_eq!(n, 2);

    let (sql, rows) = last_many(session.driver());
    assert_eq!(sql, "insert into t values (?, ?)");
    assert_eq!(rows[1], [Value::Int(2), Value::from("b")]);
}

#[tokio::test]
async fn positional_batch_resolves_duplicate_keys() {
    let mut session = Session::new(ScriptedDriver::new());
    let rows: Vec<Vec<Value>> = vec![vec![1.into(), "a".into()], vec![2.into(), "b".into()]];
    session
        .write_many("select :id, :name, :id", rows)
        .await
        .unwrap();

    let (_, rows) = last_many(session.driver());
    assert_eq!(rows[0], [Value::Int(1), Value::from("a"), Value::Int(1)]);
}

#[tokio::test]
async fn missing_key_never_reaches_the_driver() {
    let mut session = Session::new(ScriptedDriver::new());
    let err = session
        .write_many(
            "insert into t values (:id, :name)",
            vec![record! { "id" => 1, "name" => "a" }, record! { "id" => 2 }],
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DbError::MissingParameter { ref key, record: Some(1) } if key == "name"
    ));
    assert!(session.driver().calls.is_empty());
}

#[tokio::test]
async fn empty_arguments_pass_sql_through() {
    let mut session = Session::new(ScriptedDriver::new());
    session.execute("select 1::int", ()).await.unwrap();
    session.execute("select 2", KeyedRecord::new()).await.unwrap();

    let sqls: Vec<_> = session
        .driver()
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::One { sql, params } if params.is_empty() => Some(sql.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(sqls, ["select 1::int", "select 2"]);

    let n = session
        .execute("insert into t values (:a)", Vec::<KeyedRecord>::new())
        .await
        .unwrap();
    assert_eq!(n, 0);
    assert!(session.driver().many_calls().is_empty());
}

#[tokio::test]
async fn malformed_placeholder_is_rejected_before_execution() {
    let mut session = Session::new(ScriptedDriver::new());
    let err = session
        .write("select a from t where b = :", record! { "b" => 1 })
        .await
        .unwrap_err();
    assert!(err.is_compile_error());
    assert!(session.driver().calls.is_empty());
}

#[tokio::test]
async fn failed_single_write_is_rolled_back() {
    let mut session = Session::new(ScriptedDriver::failing_on([9]));
    let err = session
        .write("insert into t values (:id)", record! { "id" => 9 })
        .await
        .unwrap_err();
    assert!(err.is_database_error());
    assert_eq!(session.driver().calls.last(), Some(&Call::Rollback));
}

#[tokio::test]
async fn autocommit_commits_single_writes() {
    let config = SessionConfig::new().autocommit(true);
    let mut session = Session::with_config(ScriptedDriver::new(), config).unwrap();
    session
        .write("delete from t where id = :id", record! { "id" => 1 })
        .await
        .unwrap();
    assert_eq!(session.driver().calls.last(), Some(&Call::Commit));

    let mut session = Session::new(ScriptedDriver::new());
    session
        .write("delete from t where id = :id", record! { "id" => 1 })
        .await
        .unwrap();
    assert_eq!(session.driver().count(&Call::Commit), 0);
    session.commit().await.unwrap();
    assert_eq!(session.driver().count(&Call::Commit), 1);
}

#[tokio::test]
async fn compile_cache_is_used() {
    let config = SessionConfig::new().compile_cache(4);
    let session = Session::with_config(ScriptedDriver::new(), config).unwrap();
    let a = session.compile("select :a").unwrap();
    let b = session.compile("select :a").unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let config = SessionConfig::new().executor(ExecutorConfig::new().chunk_size(0));
    assert!(matches!(
        Session::with_config(ScriptedDriver::new(), config),
        Err(DbError::Config(_))
    ));
}

#[tokio::test]
async fn table_insert_update_delete() {
    let mut session = Session::new(ScriptedDriver::with_style(ParamStyle::Dollar));
    let mut users = session.table("users").unwrap();

    users
        .insert_one(&record! { "id" => 1, "name" => "a" })
        .await
        .unwrap();
    users
        .update(&record! { "id" => 1 }, &record! { "name" => "b" })
        .await
        .unwrap();
    users.delete(&record! { "id" => 1 }).await.unwrap();
    users.delete_all().await.unwrap();

    let sqls: Vec<_> = session
        .driver()
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::One { sql, .. } => Some(sql.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        sqls,
        [
            "INSERT INTO users (id, name) VALUES ($1, $2)",
            "UPDATE users SET name = $1 WHERE id = $2",
            "DELETE FROM users WHERE id = $1",
            "DELETE FROM users",
        ]
    );
}

#[tokio::test]
async fn table_guards_against_unbounded_writes() {
    let mut session = Session::new(ScriptedDriver::new());
    let mut t = session.table("t").unwrap();

    assert!(matches!(
        t.delete(&KeyedRecord::new()).await,
        Err(DbError::Validation(_))
    ));
    assert!(matches!(
        t.update(&record! { "id" => 1 }, &KeyedRecord::new()).await,
        Err(DbError::Validation(_))
    ));
    assert!(session.table("t; drop table x").is_err());
    assert!(session.driver().calls.is_empty());
}

#[tokio::test]
async fn table_insert_many_and_merge() {
    let mut session = Session::new(ScriptedDriver::new());
    let records = vec![
        record! { "id" => 1, "name" => "a" },
        record! { "id" => 2, "name" => "b" },
    ];

    let mut t = session.table("t").unwrap();
    assert_eq!(t.insert_many(&records).await.unwrap(), 2);
    let outcome = t.merge(&records, &["id"]).await.unwrap();
    assert_eq!(outcome.deleted, 2);
    assert_eq!(outcome.inserted, 2);

    let many: Vec<_> = session
        .driver()
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::Many { sql, rows } => Some((sql.as_str(), rows.len())),
            _ => None,
        })
        .collect();
    assert_eq!(
        many,
        [
            ("INSERT INTO t (id, name) VALUES (?, ?)", 2),
            ("DELETE FROM t WHERE id = ?", 2),
            ("INSERT INTO t (id, name) VALUES (?, ?)", 2),
        ]
    );

    assert_eq!(
        session.driver().trace()[2..],
        ["many 2", "many 2", "commit"]
    );

    let mut t = session.table("t").unwrap();
    assert!(t.merge(&records, &["missing"]).await.is_err());
}

#[tokio::test]
async fn failed_merge_insert_restores_deleted_rows() {
    // delete rows start with `seq`, insert rows with `id`
    let mut session = Session::new(ScriptedDriver::failing_on([2]));
    let records = vec![
        record! { "id" => 1, "seq" => 10 },
        record! { "id" => 2, "seq" => 20 },
    ];

    let err = session
        .table("t")
        .unwrap()
        .merge(&records, &["seq"])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DbError::Interrupted { applied: 0, ref source, .. } if source.is_database_error()
    ));
    assert_eq!(session.driver().trace(), ["many 2", "many 2", "rollback"]);
    assert_eq!(session.driver().rows_kept(), 0);
}
