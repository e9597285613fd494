//! Retention cleanup tests

use std::sync::Arc;

use footprint::analytics::DataRetentionTask;
use footprint::storage::{
    DeviceClass, PageViewEvent, SeaOrmStorage, SessionEvent, StorageFactory, VisitorEvent,
};
use footprint::utils::now_millis;
use tempfile::TempDir;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

async fn temp_storage() -> (TempDir, Arc<SeaOrmStorage>) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("retention.db").display());
    let storage = StorageFactory::create_with_url(&url)
        .await
        .expect("Failed to create storage");
    (dir, storage)
}

async fn add_visitor(storage: &SeaOrmStorage, id: &str, ts: i64) {
    storage
        .upsert_visitor(&VisitorEvent {
            id: id.to_string(),
            timestamp: ts,
            browser: "Chrome".to_string(),
            device: DeviceClass::Desktop,
            screen_size: "1280x720".to_string(),
        })
        .await
        .unwrap();
}

async fn add_page_view(storage: &SeaOrmStorage, visitor_id: &str, ts: i64) {
    storage
        .insert_page_view(&PageViewEvent {
            visitor_id: visitor_id.to_string(),
            page: "/".to_string(),
            timestamp: ts,
        })
        .await
        .unwrap();
}

async fn add_session(storage: &SeaOrmStorage, visitor_id: &str, ts: i64) {
    storage
        .insert_session(&SessionEvent {
            visitor_id: visitor_id.to_string(),
            duration: 45,
            timestamp: ts,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cleanup_on_empty_database() {
    let (_dir, storage) = temp_storage().await;
    let report = DataRetentionTask::new(storage, 30).run_cleanup().await.unwrap();
    assert_eq!(report.total(), 0);
}

#[tokio::test]
async fn test_cleanup_keeps_recent_records() {
    let (_dir, storage) = temp_storage().await;
    let now = now_millis();
    add_visitor(&storage, "fresh", now - DAY_MS).await;
    add_page_view(&storage, "fresh", now - DAY_MS).await;
    add_session(&storage, "fresh", now - DAY_MS).await;

    let report = DataRetentionTask::new(storage.clone(), 30)
        .run_cleanup()
        .await
        .unwrap();
    assert_eq!(report.total(), 0);
    assert_eq!(storage.count_visitors().await.unwrap(), 1);
    assert_eq!(storage.count_page_views().await.unwrap(), 1);
    assert_eq!(storage.count_sessions().await.unwrap(), 1);
}

#[tokio::test]
async fn test_stale_visitor_takes_its_records_with_it() {
    let (_dir, storage) = temp_storage().await;
    let now = now_millis();
    let stale = now - 31 * DAY_MS;

    add_visitor(&storage, "old", stale).await;
    // 记录本身还在窗口内，但属于过期访客
    add_page_view(&storage, "old", now).await;
    add_session(&storage, "old", now).await;

    let report = DataRetentionTask::new(storage.clone(), 30)
        .run_cleanup()
        .await
        .unwrap();
    assert_eq!(report.visitors, 1);
    assert_eq!(report.page_views, 1);
    assert_eq!(report.session_durations, 1);
    assert!(storage.get_visitor("old").await.unwrap().is_none());
    assert_eq!(storage.count_page_views().await.unwrap(), 0);
}

#[tokio::test]
async fn test_old_records_of_active_visitor_are_removed() {
    let (_dir, storage) = temp_storage().await;
    let now = now_millis();
    let stale = now - 45 * DAY_MS;

    add_visitor(&storage, "regular", now).await;
    add_page_view(&storage, "regular", stale).await;
    add_page_view(&storage, "regular", now).await;
    add_session(&storage, "regular", stale).await;

    let report = DataRetentionTask::new(storage.clone(), 30)
        .run_cleanup()
        .await
        .unwrap();
    assert_eq!(report.visitors, 0);
    assert_eq!(report.page_views, 1);
    assert_eq!(report.session_durations, 1);

    assert!(storage.get_visitor("regular").await.unwrap().is_some());
    let views = storage.all_page_views().await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].timestamp, now);
}

#[tokio::test]
async fn test_purge_before_is_idempotent() {
    let (_dir, storage) = temp_storage().await;
    add_visitor(&storage, "a", 100).await;
    add_visitor(&storage, "b", 300).await;
    add_page_view(&storage, "b", 150).await;

    let first = storage.purge_before(200).await.unwrap();
    assert_eq!(first.visitors, 1);
    assert_eq!(first.page_views, 1);

    let second = storage.purge_before(200).await.unwrap();
    assert_eq!(second.total(), 0);
    assert_eq!(storage.count_visitors().await.unwrap(), 1);
}
