mod common;

use common::{result_frame, table, MemoryDb};
use std::time::Duration;
use zno_ingest::provision::provision;
use zno_ingest::retry::RetryPolicy;
use zno_ingest::schema::TableSchema;
use zno_ingest::store::Progress;
use zno_ingest::IngestError;

const TABLE: &str = "zno_results";

#[tokio::test]
async fn test_provision_seeds_progress_once() {
    let db = MemoryDb::new();
    let schema = TableSchema::infer(&result_frame(1)).unwrap();
    let policy = RetryPolicy::default();

    provision(&db.connector(), &policy, &table(TABLE), &schema, 40).await.unwrap();
    assert_eq!(db.progress(TABLE), Some(Progress::start(40)));

    provision(&db.connector(), &policy, &table(TABLE), &schema, 40).await.unwrap();
    assert_eq!(db.progress(TABLE), Some(Progress::start(40)));
    assert_eq!(db.state().provisions, 2);
    assert_eq!(
        db.state().tables[TABLE].columns,
        vec!["outid", "birth", "sextypename", "year", "regname", "ukradaptscale", "engteststatus", "engball100"]
    );
}

#[tokio::test]
async fn test_provision_keeps_partial_progress() {
    let db = MemoryDb::new();
    let schema = TableSchema::infer(&result_frame(1)).unwrap();
    let policy = RetryPolicy::default();
    let partial = Progress {
        rows_added: 30,
        rows_left: 10,
    };

    provision(&db.connector(), &policy, &table(TABLE), &schema, 40).await.unwrap();
    db.set_progress(TABLE, partial);
    provision(&db.connector(), &policy, &table(TABLE), &schema, 40).await.unwrap();

    assert_eq!(db.progress(TABLE), Some(partial));
}

#[tokio::test(start_paused = true)]
async fn test_provision_waits_for_database() {
    let db = MemoryDb::new();
    let schema = TableSchema::infer(&result_frame(1)).unwrap();
    db.fail_next_connects(2);

    provision(&db.connector(), &RetryPolicy::default(), &table(TABLE), &schema, 3)
        .await
        .unwrap();

    assert_eq!(db.connects(), 3);
    assert_eq!(db.progress(TABLE), Some(Progress::start(3)));
}

#[tokio::test(start_paused = true)]
async fn test_provision_gives_up_with_bounded_policy() {
    let db = MemoryDb::new();
    let schema = TableSchema::infer(&result_frame(1)).unwrap();
    db.fail_next_connects(5);

    let result = provision(
        &db.connector(),
        &RetryPolicy::bounded(Duration::from_millis(50), 2),
        &table(TABLE),
        &schema,
        3,
    )
    .await;

    assert!(matches!(result, Err(IngestError::RetriesExhausted { attempts: 2, .. })));
    assert!(db.progress(TABLE).is_none());
}
