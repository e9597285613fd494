//! Aggregation API integration tests
//!
//! `/api/admin/*` against a seeded SQLite database, including bearer token
//! checks and the retention cleanup endpoint.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{App, test};
use serde_json::{Value, json};
use tempfile::TempDir;

use footprint::api::middleware::AdminAuth;
use footprint::runtime::modes::server::AppState;
use footprint::services::{AnalyticsService, IngestService};
use footprint::storage::{
    DeviceClass, PageViewEvent, SeaOrmStorage, SessionEvent, StorageFactory, VisitorEvent,
};
use footprint::utils::now_millis;

const TOKEN: &str = "secret-token";
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

// =============================================================================
// Test Setup
// =============================================================================

async fn setup() -> (TempDir, Arc<SeaOrmStorage>, AppState) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("admin.db").display());
    let storage = StorageFactory::create_with_url(&url)
        .await
        .expect("Failed to create storage");

    let state = AppState::new(
        storage.clone(),
        Arc::new(IngestService::new(storage.clone(), 5)),
        Arc::new(AnalyticsService::new(storage.clone(), 50, 30)),
    );
    (dir, storage, state)
}

async fn add_visitor(storage: &SeaOrmStorage, id: &str, ts: i64, browser: &str, device: DeviceClass) {
    storage
        .upsert_visitor(&VisitorEvent {
            id: id.to_string(),
            timestamp: ts,
            browser: browser.to_string(),
            device,
            screen_size: "1920x1080".to_string(),
        })
        .await
        .unwrap();
}

async fn add_page_view(storage: &SeaOrmStorage, visitor_id: &str, page: &str, ts: i64) {
    storage
        .insert_page_view(&PageViewEvent {
            visitor_id: visitor_id.to_string(),
            page: page.to_string(),
            timestamp: ts,
        })
        .await
        .unwrap();
}

async fn add_session(storage: &SeaOrmStorage, visitor_id: &str, duration: i64, ts: i64) {
    storage
        .insert_session(&SessionEvent {
            visitor_id: visitor_id.to_string(),
            duration,
            timestamp: ts,
        })
        .await
        .unwrap();
}

/// 两个桌面访客、一个移动访客，三条浏览，两段会话
async fn seed(storage: &SeaOrmStorage) {
    let now = now_millis();
    add_visitor(storage, "a", now - 3_000, "Chrome", DeviceClass::Desktop).await;
    add_visitor(storage, "b", now - 2_000, "Firefox", DeviceClass::Desktop).await;
    add_visitor(storage, "c", now - 1_000, "Safari", DeviceClass::Mobile).await;

    add_page_view(storage, "a", "/", now).await;
    add_page_view(storage, "b", "/projects", now).await;
    add_page_view(storage, "c", "/", now).await;

    add_session(storage, "a", 30, now).await;
    add_session(storage, "c", 150, now).await;
}

fn authed_get(uri: &str) -> test::TestRequest {
    test::TestRequest::get()
        .uri(uri)
        .insert_header(("Authorization", format!("Bearer {}", TOKEN)))
}

// =============================================================================
// Authentication
// =============================================================================

#[actix_rt::test]
async fn test_admin_requires_token() {
    let (_dir, _storage, state) = setup().await;
    let app = test::init_service(
        App::new().configure(state.configure(AdminAuth::new(Some(TOKEN.into())), None)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/admin/total-visitors")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/admin/total-visitors")
        .insert_header(("Authorization", "Bearer wrong"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], json!(false));

    let req = authed_get("/api/admin/total-visitors").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_admin_open_without_configured_token() {
    let (_dir, _storage, state) = setup().await;
    let app = test::init_service(App::new().configure(state.configure(AdminAuth::new(None), None))).await;

    let req = test::TestRequest::get()
        .uri("/api/admin/total-page-views")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "count": 0 }));
}

// =============================================================================
// Aggregations
// =============================================================================

#[actix_rt::test]
async fn test_totals_and_device_shares() {
    let (_dir, storage, state) = setup().await;
    seed(&storage).await;
    let app = test::init_service(
        App::new().configure(state.configure(AdminAuth::new(Some(TOKEN.into())), None)),
    )
    .await;

    let body: Value =
        test::call_and_read_body_json(&app, authed_get("/api/admin/total-visitors").to_request())
            .await;
    assert_eq!(body["count"], json!(3));

    let body: Value =
        test::call_and_read_body_json(&app, authed_get("/api/admin/total-page-views").to_request())
            .await;
    assert_eq!(body["count"], json!(3));

    let body: Value =
        test::call_and_read_body_json(&app, authed_get("/api/admin/mobile-users").to_request())
            .await;
    assert_eq!(body["percentage"], json!(33));
    assert_eq!(body["count"], json!(1));

    let body: Value =
        test::call_and_read_body_json(&app, authed_get("/api/admin/pc-users").to_request()).await;
    assert_eq!(body["percentage"], json!(67));
    assert_eq!(body["total"], json!(3));
}

#[actix_rt::test]
async fn test_grouped_stats() {
    let (_dir, storage, state) = setup().await;
    seed(&storage).await;
    let app = test::init_service(
        App::new().configure(state.configure(AdminAuth::new(Some(TOKEN.into())), None)),
    )
    .await;

    let browsers: Value =
        test::call_and_read_body_json(&app, authed_get("/api/admin/browser-stats").to_request())
            .await;
    let names: Vec<&str> = browsers
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    // 计数相同按名称排序
    assert_eq!(names, vec!["Chrome", "Firefox", "Safari"]);

    let pages: Value =
        test::call_and_read_body_json(&app, authed_get("/api/admin/page-stats").to_request())
            .await;
    assert_eq!(pages[0]["name"], json!("/"));
    assert_eq!(pages[0]["count"], json!(2));
    assert_eq!(pages[0]["percentage"], json!(67));

    let devices: Value =
        test::call_and_read_body_json(&app, authed_get("/api/admin/device-stats").to_request())
            .await;
    let devices = devices.as_array().unwrap();
    assert_eq!(devices.len(), 3);
    assert_eq!(devices[0]["name"], json!("Desktop"));
    assert_eq!(devices[2]["name"], json!("Tablet"));
    assert_eq!(devices[2]["count"], json!(0));
}

#[actix_rt::test]
async fn test_sessions_and_recent_visitors() {
    let (_dir, storage, state) = setup().await;
    seed(&storage).await;
    let app = test::init_service(
        App::new().configure(state.configure(AdminAuth::new(Some(TOKEN.into())), None)),
    )
    .await;

    let buckets: Value =
        test::call_and_read_body_json(&app, authed_get("/api/admin/session-buckets").to_request())
            .await;
    let counts: Vec<u64> = buckets
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["count"].as_u64().unwrap())
        .collect();
    assert_eq!(counts, vec![1, 1, 0, 0, 0]);
    assert_eq!(buckets[0]["label"], json!("< 1 min"));

    let avg: Value =
        test::call_and_read_body_json(&app, authed_get("/api/admin/avg-session").to_request())
            .await;
    assert_eq!(avg["seconds"], json!(90));
    assert_eq!(avg["formatted"], json!("1m 30s"));

    let recent: Value = test::call_and_read_body_json(
        &app,
        authed_get("/api/admin/recent-visitors?limit=2").to_request(),
    )
    .await;
    let ids: Vec<&str> = recent
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["c", "b"]);
    assert_eq!(recent[0]["screenSize"], json!("1920x1080"));
}

#[actix_rt::test]
async fn test_data_dump() {
    let (_dir, storage, state) = setup().await;
    seed(&storage).await;
    let app = test::init_service(
        App::new().configure(state.configure(AdminAuth::new(Some(TOKEN.into())), None)),
    )
    .await;

    let data: Value =
        test::call_and_read_body_json(&app, authed_get("/api/admin/data").to_request()).await;
    assert_eq!(data["visitors"].as_array().unwrap().len(), 3);
    assert_eq!(data["pageViews"].as_array().unwrap().len(), 3);

    let mut durations: Vec<u64> = data["sessionDurations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d.as_u64().unwrap())
        .collect();
    durations.sort_unstable();
    assert_eq!(durations, vec![30, 150]);
}

// =============================================================================
// Cleanup
// =============================================================================

#[actix_rt::test]
async fn test_cleanup_removes_stale_records_once() {
    let (_dir, storage, state) = setup().await;
    seed(&storage).await;

    let old = now_millis() - 40 * DAY_MS;
    add_visitor(&storage, "old", old, "Edge", DeviceClass::Desktop).await;
    add_page_view(&storage, "old", "/about", old).await;
    add_session(&storage, "old", 600, old).await;

    let app = test::init_service(
        App::new().configure(state.configure(AdminAuth::new(Some(TOKEN.into())), None)),
    )
    .await;

    let cleanup = || {
        test::TestRequest::post()
            .uri("/api/admin/cleanup")
            .insert_header(("Authorization", format!("Bearer {}", TOKEN)))
            .to_request()
    };

    let first: Value = test::call_and_read_body_json(&app, cleanup()).await;
    assert_eq!(first["success"], json!(true));
    assert_eq!(first["retentionDays"], json!(30));
    assert_eq!(first["deleted"]["visitors"], json!(1));
    assert_eq!(first["deleted"]["pageViews"], json!(1));
    assert_eq!(first["deleted"]["sessionDurations"], json!(1));
    assert_eq!(first["totalDeleted"], json!(3));

    let second: Value = test::call_and_read_body_json(&app, cleanup()).await;
    assert_eq!(second["totalDeleted"], json!(0));

    assert_eq!(storage.count_visitors().await.unwrap(), 3);
    assert_eq!(storage.count_page_views().await.unwrap(), 3);
    assert_eq!(storage.count_sessions().await.unwrap(), 2);
}

#[actix_rt::test]
async fn test_cleanup_requires_token() {
    let (_dir, _storage, state) = setup().await;
    let app = test::init_service(
        App::new().configure(state.configure(AdminAuth::new(Some(TOKEN.into())), None)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/admin/cleanup")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
