//! Database-backed tests.
//!
//! These run against the database named by `POSTGRES_URL` (read from the
//! environment or a `.env` file) and are skipped when it is not set. Tables
//! get unique names so tests can run in parallel; the migration test owns the
//! `__diesel_schema_migrations` table and expects no other migrations there.

use std::fs;
use std::path::Path;
use std::time::Duration;

use diesel::QueryableByName;
use diesel::sql_types::{Integer, Nullable, Text};
use pgdriver::migrate::{
    DieselMigrationEngine, MigrateError, MigrationCommand, migrate_down, migrate_up,
};
use pgdriver::{PgCause, PgClient, PgConfig, PgError, sql_args};
use tokio_util::sync::CancellationToken;

fn database_url() -> Option<String> {
    let _ = dotenvy::dotenv();
    std::env::var("POSTGRES_URL").ok()
}

async fn open_client(database_url: &str) -> PgClient {
    let config = PgConfig::new(database_url)
        .with_max_connections(2)
        .with_connection_timeout_secs(5);
    PgClient::new(config).await.expect("database should be reachable")
}

macro_rules! require_database {
    () => {
        match database_url() {
            Some(url) => url,
            None => {
                eprintln!("POSTGRES_URL is not set, skipping");
                return;
            }
        }
    };
}

fn unique_table(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}

#[derive(Debug, PartialEq, QueryableByName)]
struct Widget {
    #[diesel(sql_type = Integer)]
    id: i32,
    #[diesel(sql_type = Text)]
    name: String,
    #[diesel(sql_type = Nullable<Text>)]
    note: Option<String>,
}

async fn create_widgets(client: &PgClient, rows: i32) -> String {
    let table = unique_table("widgets");
    client
        .execute(
            &format!("CREATE TABLE {table} (id INT PRIMARY KEY, name TEXT NOT NULL, note TEXT)"),
            &[],
        )
        .await
        .unwrap();

    for id in 1..=rows {
        client
            .execute(
                &format!("INSERT INTO {table} (id, name, note) VALUES ($1, $2, $3)"),
                &sql_args![id, format!("widget-{id}"), None::<String>],
            )
            .await
            .unwrap();
    }

    table
}

async fn drop_table(client: &PgClient, table: &str) {
    client
        .execute(&format!("DROP TABLE IF EXISTS {table}"), &[])
        .await
        .unwrap();
}

#[tokio::test]
async fn open_then_ping() {
    let url = require_database!();
    let client = open_client(&url).await;

    client.ping().await.unwrap();
    client.close();
}

#[tokio::test]
async fn count_rows_counts_rows() {
    let url = require_database!();
    let client = open_client(&url).await;
    let table = create_widgets(&client, 3).await;

    let count = client
        .count_rows(&format!("select count(*) from {table}"), &[])
        .await
        .unwrap();
    assert_eq!(count, 3);

    let count = client
        .count_rows(&format!("SELECT count(*) FROM {table} WHERE id > $1"), &sql_args![1])
        .await
        .unwrap();
    assert_eq!(count, 2);

    let count = client
        .count_rows(&format!("SELECT count(*) FROM {table} WHERE id > 100;"), &[])
        .await
        .unwrap();
    assert_eq!(count, 0);

    drop_table(&client, &table).await;
    client.close();
}

#[tokio::test]
async fn count_rows_on_failing_query_is_a_row_failure() {
    let url = require_database!();
    let client = open_client(&url).await;

    let err = client
        .count_rows("SELECT count(*) FROM table_that_does_not_exist", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, PgError::QueryRow(PgCause::Query(_))));

    client.close();
}

#[tokio::test]
async fn count_rows_rejects_non_integer_values() {
    let url = require_database!();
    let client = open_client(&url).await;

    for sql in ["SELECT 2.6::numeric", "SELECT '7'::text", "SELECT 1.0::float8"] {
        let err = client.count_rows(sql, &[]).await.unwrap_err();
        assert!(matches!(err, PgError::QueryRow(_)), "{sql}: {err}");
    }

    let err = client
        .count_rows("SELECT NULL::int8", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, PgError::QueryRow(PgCause::Unexpected(_))));

    assert_eq!(client.count_rows("SELECT 5::int2", &[]).await.unwrap(), 5);
    client.close();
}

#[tokio::test]
async fn count_rows_accepts_trailing_comment() {
    let url = require_database!();
    let client = open_client(&url).await;
    let table = create_widgets(&client, 2).await;

    let count = client
        .count_rows(&format!("SELECT count(*) FROM {table} -- all widgets"), &[])
        .await
        .unwrap();
    assert_eq!(count, 2);

    drop_table(&client, &table).await;
    client.close();
}

#[tokio::test]
async fn execute_reports_statement_failures() {
    let url = require_database!();
    let client = open_client(&url).await;

    let table = unique_table("trivial");
    client
        .execute(&format!("CREATE TABLE {table} (id INT)"), &[])
        .await
        .unwrap();

    let affected = client
        .execute(&format!("INSERT INTO {table} (id) VALUES ($1), ($2)"), &sql_args![1, 2])
        .await
        .unwrap();
    assert_eq!(affected, 2);

    let err = client
        .execute("DELETE FROM table_that_does_not_exist", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, PgError::Execute(PgCause::Query(_))));
    assert!(err.to_string().starts_with("execute query database failure"));

    drop_table(&client, &table).await;
    client.close();
}

#[tokio::test]
async fn constraint_violations_are_named() {
    let url = require_database!();
    let client = open_client(&url).await;
    let table = create_widgets(&client, 1).await;

    let err = client
        .execute(
            &format!("INSERT INTO {table} (id, name) VALUES ($1, $2)"),
            &sql_args![1, "duplicate"],
        )
        .await
        .unwrap_err();
    assert_eq!(err.constraint(), Some(format!("{table}_pkey").as_str()));

    drop_table(&client, &table).await;
    client.close();
}

#[tokio::test]
async fn query_rows_decodes_every_row() {
    let url = require_database!();
    let client = open_client(&url).await;
    let table = create_widgets(&client, 3).await;

    let rows = client
        .query_rows::<Widget>(
            &format!("SELECT id, name, note FROM {table} WHERE id >= $1 ORDER BY id"),
            &sql_args![2],
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    let widgets: Vec<Widget> = rows.collect();
    assert_eq!(
        widgets,
        vec![
            Widget {
                id: 2,
                name: "widget-2".into(),
                note: None
            },
            Widget {
                id: 3,
                name: "widget-3".into(),
                note: None
            },
        ]
    );

    let err = client
        .query_rows::<Widget>("SELECT id, name, note FROM table_that_does_not_exist", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, PgError::Query(_)));

    drop_table(&client, &table).await;
    client.close();
}

#[tokio::test]
async fn query_row_fails_lazily_on_scan() {
    let url = require_database!();
    let client = open_client(&url).await;
    let table = create_widgets(&client, 1).await;

    let row = client
        .query_row("SELECT id, name, note FROM table_that_does_not_exist", &[])
        .await
        .expect("only the connection is acquired up front");
    let err = row.scan::<Widget>().await.unwrap_err();
    assert!(matches!(err, PgError::QueryRow(PgCause::Query(_))));

    let widget: Widget = client
        .query_row(
            &format!("SELECT id, name, note FROM {table} WHERE id = $1"),
            &sql_args![1],
        )
        .await
        .unwrap()
        .scan()
        .await
        .unwrap();
    assert_eq!(widget.name, "widget-1");

    let missing = client
        .query_row(
            &format!("SELECT id, name, note FROM {table} WHERE id = $1"),
            &sql_args![42],
        )
        .await
        .unwrap();
    let err = missing.scan::<Widget>().await.unwrap_err();
    assert!(err.is_not_found());

    let none = client
        .query_row(
            &format!("SELECT id, name, note FROM {table} WHERE id = $1"),
            &sql_args![42],
        )
        .await
        .unwrap()
        .scan_optional::<Widget>()
        .await
        .unwrap();
    assert!(none.is_none());

    drop_table(&client, &table).await;
    client.close();
}

#[tokio::test]
async fn failures_return_connections_to_the_pool() {
    let url = require_database!();
    let client = open_client(&url).await;

    // More failures than the pool has connections: a leaked borrow would
    // make a later acquire time out.
    for _ in 0..6 {
        let err = client.execute("SELECT * FROM missing_a", &[]).await.unwrap_err();
        assert!(matches!(err, PgError::Execute(_)));

        let err = client.count_rows("SELECT * FROM missing_b", &[]).await.unwrap_err();
        assert!(matches!(err, PgError::QueryRow(_)));

        let row = client.query_row("SELECT * FROM missing_c", &[]).await.unwrap();
        assert!(row.scan::<Widget>().await.is_err());

        // Dropped without scanning.
        let row = client.query_row("SELECT 1", &[]).await.unwrap();
        drop(row);
    }

    assert_eq!(client.pool_status().in_use(), 0);
    client.ping().await.unwrap();
    client.close();
}

#[tokio::test]
async fn dropped_operations_return_connections_to_the_pool() {
    let url = require_database!();
    let client = open_client(&url).await;

    // More timed-out calls than the pool has connections.
    for _ in 0..4 {
        let slow = client.count_rows("SELECT count(*) FROM pg_sleep(3)", &[]);
        let elapsed = tokio::time::timeout(Duration::from_millis(100), slow).await;
        assert!(elapsed.is_err());
    }

    assert_eq!(client.pool_status().in_use(), 0);
    tokio::time::timeout(Duration::from_secs(2), client.ping())
        .await
        .expect("ping should not wait on a leaked connection")
        .unwrap();
    client.close();
}

#[tokio::test]
async fn concurrent_callers_share_the_pool() {
    let url = require_database!();
    let client = open_client(&url).await;

    let tasks: Vec<_> = (0..8)
        .map(|n| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .count_rows("SELECT $1::int4", &sql_args![n])
                    .await
            })
        })
        .collect();

    for (n, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap().unwrap(), n as i64);
    }

    assert_eq!(client.pool_status().in_use(), 0);
    client.close();
}

fn write_migration(dir: &Path, version: &str, table: &str) {
    let migration = dir.join(format!("{version}_create_{table}"));
    fs::create_dir_all(&migration).unwrap();
    fs::write(
        migration.join("up.sql"),
        format!("CREATE TABLE {table} (id INT PRIMARY KEY);\n"),
    )
    .unwrap();
    fs::write(migration.join("down.sql"), format!("DROP TABLE {table};\n")).unwrap();
}

#[tokio::test]
async fn migrations_apply_and_revert_once() {
    let url = require_database!();
    let dir = tempfile::tempdir().unwrap();
    let table = unique_table("migrated");
    write_migration(dir.path(), "20240101000000", &table);
    let source = format!("file://{}", dir.path().display());

    let applied = migrate_up(&source, &url).await.unwrap();
    assert_eq!(applied.processed_versions, vec!["20240101000000"]);

    // Nothing pending: still a success.
    let again = migrate_up(&source, &url).await.unwrap();
    assert!(again.is_no_op());

    let versions = {
        let source = source.clone();
        let url = url.clone();
        tokio::task::spawn_blocking(move || {
            DieselMigrationEngine::new(&source, &url)?.applied_versions()
        })
        .await
        .unwrap()
        .unwrap()
    };
    assert!(versions.contains(&"20240101000000".to_string()));

    let client = open_client(&url).await;
    let count = client
        .count_rows(&format!("SELECT count(*) FROM {table}"), &[])
        .await
        .unwrap();
    assert_eq!(count, 0);
    client.close();

    let reverted = migrate_down(&source, &url).await.unwrap();
    assert_eq!(reverted.processed_versions, vec!["20240101000000"]);

    let again = migrate_down(&source, &url).await.unwrap();
    assert!(again.is_no_op());

    // Host wiring: success requests shutdown, no-op included.
    let shutdown = CancellationToken::new();
    let command = MigrationCommand::new(
        source.clone(),
        url.clone(),
        tracing::dispatcher::get_default(|d| d.clone()),
        shutdown.clone(),
    );
    command.up().await.unwrap();
    assert!(shutdown.is_cancelled());
    migrate_down(&source, &url).await.unwrap();

    // An empty directory is a source with nothing to apply.
    let empty = tempfile::tempdir().unwrap();
    let empty_source = format!("file://{}", empty.path().display());
    let nothing = migrate_up(&empty_source, &url).await.unwrap();
    assert!(nothing.is_no_op());

    let err = migrate_up("file:///definitely/not/here", &url).await.unwrap_err();
    assert!(matches!(err, MigrateError::Source { .. }));
}
