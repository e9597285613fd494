//! Storage integration tests
//!
//! Visitor upsert, append-only inserts and the aggregation queries, against
//! a temporary SQLite database.

use std::sync::Arc;

use footprint::analytics::SESSION_BUCKETS;
use footprint::errors::FootprintError;
use footprint::services::AnalyticsService;
use footprint::storage::{
    DeviceClass, PageViewEvent, SeaOrmStorage, SessionEvent, StorageFactory, VisitorEvent,
};
use tempfile::TempDir;

// =============================================================================
// Test Setup
// =============================================================================

async fn temp_storage() -> (TempDir, Arc<SeaOrmStorage>) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("storage.db").display());
    let storage = StorageFactory::create_with_url(&url)
        .await
        .expect("Failed to create storage");
    (dir, storage)
}

fn visitor(id: &str, ts: i64, browser: &str, device: DeviceClass) -> VisitorEvent {
    VisitorEvent {
        id: id.to_string(),
        timestamp: ts,
        browser: browser.to_string(),
        device,
        screen_size: "1920x1080".to_string(),
    }
}

fn page_view(visitor_id: &str, page: &str, ts: i64) -> PageViewEvent {
    PageViewEvent {
        visitor_id: visitor_id.to_string(),
        page: page.to_string(),
        timestamp: ts,
    }
}

fn session(visitor_id: &str, duration: i64, ts: i64) -> SessionEvent {
    SessionEvent {
        visitor_id: visitor_id.to_string(),
        duration,
        timestamp: ts,
    }
}

// =============================================================================
// Visitor upsert
// =============================================================================

#[tokio::test]
async fn test_upsert_counts_visits_without_duplicating_rows() {
    let (_dir, storage) = temp_storage().await;

    for ts in 1..=3 {
        storage
            .upsert_visitor(&visitor("v1", ts, "Chrome", DeviceClass::Desktop))
            .await
            .unwrap();
    }

    assert_eq!(storage.count_visitors().await.unwrap(), 1);
    let visitors = storage.all_visitors().await.unwrap();
    assert_eq!(visitors.len(), 1);
    assert_eq!(visitors[0].visits, 3);
    assert_eq!(visitors[0].timestamp, 3);
}

#[tokio::test]
async fn test_upsert_overwrites_fingerprint_fields() {
    let (_dir, storage) = temp_storage().await;

    storage
        .upsert_visitor(&visitor("v1", 1, "Chrome", DeviceClass::Desktop))
        .await
        .unwrap();
    storage
        .upsert_visitor(&VisitorEvent {
            screen_size: "390x844".into(),
            ..visitor("v1", 2, "Safari", DeviceClass::Mobile)
        })
        .await
        .unwrap();

    let v = &storage.all_visitors().await.unwrap()[0];
    assert_eq!(v.browser.as_deref(), Some("Safari"));
    assert_eq!(v.device.as_deref(), Some("Mobile"));
    assert_eq!(v.screen_size.as_deref(), Some("390x844"));
    assert_eq!(v.visits, 2);
}

#[tokio::test]
async fn test_concurrent_upserts_keep_every_visit() {
    let (_dir, storage) = temp_storage().await;
    storage
        .upsert_visitor(&visitor("v1", 0, "Chrome", DeviceClass::Desktop))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for ts in 1..=10 {
        let storage = storage.clone();
        handles.push(tokio::spawn(async move {
            storage
                .upsert_visitor(&visitor("v1", ts, "Chrome", DeviceClass::Desktop))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let visitors = storage.all_visitors().await.unwrap();
    assert_eq!(visitors.len(), 1);
    assert_eq!(visitors[0].visits, 11);
}

// =============================================================================
// Append-only records
// =============================================================================

#[tokio::test]
async fn test_page_view_for_unknown_visitor_is_rejected() {
    let (_dir, storage) = temp_storage().await;

    let err = storage
        .insert_page_view(&page_view("ghost", "/", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, FootprintError::VisitorNotFound(_)));
    assert_eq!(storage.count_page_views().await.unwrap(), 0);
}

#[tokio::test]
async fn test_session_for_unknown_visitor_is_rejected() {
    let (_dir, storage) = temp_storage().await;

    let err = storage
        .insert_session(&session("ghost", 30, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, FootprintError::VisitorNotFound(_)));
}

#[tokio::test]
async fn test_page_counts_group_by_page() {
    let (_dir, storage) = temp_storage().await;
    storage
        .upsert_visitor(&visitor("v1", 1, "Chrome", DeviceClass::Desktop))
        .await
        .unwrap();
    for page in ["/", "/projects", "/"] {
        storage.insert_page_view(&page_view("v1", page, 2)).await.unwrap();
    }

    let service = AnalyticsService::new(storage.clone(), 50, 30);
    let stats = service.page_stats().await.unwrap();
    let pairs: Vec<(&str, u64)> = stats.iter().map(|r| (r.name.as_str(), r.count)).collect();
    assert_eq!(pairs, vec![("/", 2), ("/projects", 1)]);
    assert_eq!(stats[0].percentage, 67);
}

// =============================================================================
// Aggregations
// =============================================================================

#[tokio::test]
async fn test_session_buckets_one_per_bucket() {
    let (_dir, storage) = temp_storage().await;
    storage
        .upsert_visitor(&visitor("v1", 1, "Chrome", DeviceClass::Desktop))
        .await
        .unwrap();
    for duration in [30, 90, 250, 550, 900] {
        storage.insert_session(&session("v1", duration, 2)).await.unwrap();
    }

    let counts = storage.session_bucket_counts().await.unwrap();
    assert_eq!(counts, [1u64; SESSION_BUCKETS.len()]);

    let service = AnalyticsService::new(storage.clone(), 50, 30);
    let buckets = service.session_buckets().await.unwrap();
    let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["< 1 min", "1-3 min", "3-5 min", "5-10 min", "> 10 min"]
    );
    assert_eq!(buckets.iter().map(|b| b.count).sum::<u64>(), 5);
}

#[tokio::test]
async fn test_bucket_boundaries_are_disjoint() {
    let (_dir, storage) = temp_storage().await;
    storage
        .upsert_visitor(&visitor("v1", 1, "Chrome", DeviceClass::Desktop))
        .await
        .unwrap();
    for duration in [5, 59, 60, 179, 180, 299, 300, 599, 600] {
        storage.insert_session(&session("v1", duration, 2)).await.unwrap();
    }

    let counts = storage.session_bucket_counts().await.unwrap();
    assert_eq!(counts, [2, 2, 2, 2, 1]);
}

#[tokio::test]
async fn test_device_share_on_empty_table_is_zero() {
    let (_dir, storage) = temp_storage().await;
    let service = AnalyticsService::new(storage, 50, 30);

    let mobile = service.device_share(DeviceClass::Mobile).await.unwrap();
    assert_eq!(mobile.percentage, 0);
    assert_eq!(mobile.total, 0);

    let devices = service.device_stats().await.unwrap();
    assert_eq!(devices.len(), 3);
    assert!(devices.iter().all(|d| d.count == 0));
}

#[tokio::test]
async fn test_device_share_rounds() {
    let (_dir, storage) = temp_storage().await;
    storage
        .upsert_visitor(&visitor("a", 1, "Chrome", DeviceClass::Mobile))
        .await
        .unwrap();
    storage
        .upsert_visitor(&visitor("b", 1, "Chrome", DeviceClass::Desktop))
        .await
        .unwrap();
    storage
        .upsert_visitor(&visitor("c", 1, "Firefox", DeviceClass::Desktop))
        .await
        .unwrap();

    let service = AnalyticsService::new(storage, 50, 30);
    assert_eq!(
        service.device_share(DeviceClass::Mobile).await.unwrap().percentage,
        33
    );
    assert_eq!(
        service.device_share(DeviceClass::Desktop).await.unwrap().percentage,
        67
    );
}

#[tokio::test]
async fn test_recent_visitors_ordered_and_limited() {
    let (_dir, storage) = temp_storage().await;
    for (i, id) in ["a", "b", "c", "d"].iter().enumerate() {
        storage
            .upsert_visitor(&visitor(id, i as i64 * 10, "Chrome", DeviceClass::Desktop))
            .await
            .unwrap();
    }

    let service = AnalyticsService::new(storage, 2, 30);
    let recent = service.recent_visitors(None).await.unwrap();
    let ids: Vec<&str> = recent.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["d", "c"]);

    let all = service.recent_visitors(Some(10)).await.unwrap();
    assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn test_avg_session_rounds_mean() {
    let (_dir, storage) = temp_storage().await;
    let service = AnalyticsService::new(storage.clone(), 50, 30);
    assert_eq!(service.avg_session().await.unwrap().seconds, 0);

    storage
        .upsert_visitor(&visitor("v1", 1, "Chrome", DeviceClass::Desktop))
        .await
        .unwrap();
    for duration in [60, 65] {
        storage.insert_session(&session("v1", duration, 2)).await.unwrap();
    }

    let avg = service.avg_session().await.unwrap();
    assert_eq!(avg.seconds, 63);
    assert_eq!(avg.formatted, "1m 3s");
}
