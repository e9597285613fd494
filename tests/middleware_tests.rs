//! Middleware tests
//!
//! AdminAuth, RequestIdMiddleware and the per-IP `/api` rate limiter.

use actix_web::http::{Method, StatusCode};
use actix_web::test::{self, TestRequest};
use actix_web::{App, HttpMessage, HttpRequest, HttpResponse, web};
use serde_json::{Value, json};

use footprint::api::middleware::{
    AdminAuth, RequestId, RequestIdMiddleware, api_rate_limiter, build_rate_limit_config,
};
use footprint::config::RateLimitConfig;

// =============================================================================
// Test Setup
// =============================================================================

async fn ok_handler() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

async fn echo_request_id(req: HttpRequest) -> HttpResponse {
    let id = req
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default();
    HttpResponse::Ok().body(id)
}

fn rate_limit(max_requests: u32) -> RateLimitConfig {
    RateLimitConfig {
        enabled: true,
        max_requests,
        window_secs: 60,
        trusted_proxies: Vec::new(),
    }
}

/// Governor 可能以错误形式返回 429
macro_rules! status_of {
    ($app:expr, $req:expr) => {
        match test::try_call_service($app, $req).await {
            Ok(resp) => resp.status(),
            Err(e) => e.as_response_error().status_code(),
        }
    };
}

// =============================================================================
// AdminAuth
// =============================================================================

#[actix_rt::test]
async fn test_admin_auth_rejects_missing_token() {
    let app = test::init_service(
        App::new().service(
            web::scope("/admin")
                .wrap(AdminAuth::new(Some("s3cret".into())))
                .route("/ping", web::get().to(ok_handler)),
        ),
    )
    .await;

    let req = TestRequest::get().uri("/admin/ping").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_admin_auth_accepts_bearer_token() {
    let app = test::init_service(
        App::new().service(
            web::scope("/admin")
                .wrap(AdminAuth::new(Some("s3cret".into())))
                .route("/ping", web::get().to(ok_handler)),
        ),
    )
    .await;

    let req = TestRequest::get()
        .uri("/admin/ping")
        .insert_header(("Authorization", "Bearer s3cret"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_admin_auth_empty_token_means_open() {
    let app = test::init_service(
        App::new().service(
            web::scope("/admin")
                .wrap(AdminAuth::new(Some(String::new())))
                .route("/ping", web::get().to(ok_handler)),
        ),
    )
    .await;

    let req = TestRequest::get().uri("/admin/ping").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_admin_auth_lets_preflight_through() {
    let app = test::init_service(
        App::new().service(
            web::scope("/admin")
                .wrap(AdminAuth::new(Some("s3cret".into())))
                .route("/ping", web::get().to(ok_handler)),
        ),
    )
    .await;

    let req = TestRequest::default()
        .method(Method::OPTIONS)
        .uri("/admin/ping")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

// =============================================================================
// RequestIdMiddleware
// =============================================================================

#[actix_rt::test]
async fn test_request_id_is_generated() {
    let app = test::init_service(
        App::new()
            .wrap(RequestIdMiddleware)
            .route("/", web::get().to(echo_request_id)),
    )
    .await;

    let resp = test::call_service(&app, TestRequest::get().uri("/").to_request()).await;
    let header = resp
        .headers()
        .get("x-request-id")
        .expect("x-request-id header")
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(header.len(), 36);

    let body = test::read_body(resp).await;
    assert_eq!(body, header.as_bytes());
}

#[actix_rt::test]
async fn test_request_id_from_upstream_is_kept() {
    let app = test::init_service(
        App::new()
            .wrap(RequestIdMiddleware)
            .route("/", web::get().to(echo_request_id)),
    )
    .await;

    let req = TestRequest::get()
        .uri("/")
        .insert_header(("X-Request-ID", "edge-1234"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.headers().get("x-request-id").unwrap(), "edge-1234");
}

#[actix_rt::test]
async fn test_request_id_rejects_garbage() {
    let app = test::init_service(
        App::new()
            .wrap(RequestIdMiddleware)
            .route("/", web::get().to(echo_request_id)),
    )
    .await;

    let req = TestRequest::get()
        .uri("/")
        .insert_header(("X-Request-ID", "<script>"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_ne!(resp.headers().get("x-request-id").unwrap(), "<script>");
}

// =============================================================================
// Rate limiting
// =============================================================================

#[actix_rt::test]
async fn test_rate_limit_returns_429_after_burst() {
    let limit = build_rate_limit_config(&rate_limit(3)).unwrap();
    let app = test::init_service(
        App::new().service(
            web::scope("/api")
                .wrap(api_rate_limiter(&limit))
                .route("/ping", web::get().to(ok_handler)),
        ),
    )
    .await;

    let peer = "203.0.113.7:40000".parse().unwrap();
    for _ in 0..3 {
        let req = TestRequest::get().uri("/api/ping").peer_addr(peer).to_request();
        assert_eq!(status_of!(&app, req), StatusCode::OK);
    }

    let req = TestRequest::get().uri("/api/ping").peer_addr(peer).to_request();
    assert_eq!(status_of!(&app, req), StatusCode::TOO_MANY_REQUESTS);
}

#[actix_rt::test]
async fn test_rate_limit_body_is_error_envelope() {
    let limit = build_rate_limit_config(&rate_limit(1)).unwrap();
    let app = test::init_service(
        App::new().service(
            web::scope("/api")
                .wrap(api_rate_limiter(&limit))
                .route("/ping", web::get().to(ok_handler)),
        ),
    )
    .await;

    let peer = "203.0.113.7:40000".parse().unwrap();
    let req = TestRequest::get().uri("/api/ping").peer_addr(peer).to_request();
    assert_eq!(status_of!(&app, req), StatusCode::OK);

    let req = TestRequest::get().uri("/api/ping").peer_addr(peer).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key("retry-after"));

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!(2004));
    assert!(body["error"].as_str().unwrap().starts_with("Too many requests"));
}

#[actix_rt::test]
async fn test_rate_limit_is_per_client() {
    let limit = build_rate_limit_config(&rate_limit(1)).unwrap();
    let app = test::init_service(
        App::new().service(
            web::scope("/api")
                .wrap(api_rate_limiter(&limit))
                .route("/ping", web::get().to(ok_handler)),
        ),
    )
    .await;

    let first = "203.0.113.7:40000".parse().unwrap();
    let second = "198.51.100.9:40000".parse().unwrap();

    let req = TestRequest::get().uri("/api/ping").peer_addr(first).to_request();
    assert_eq!(status_of!(&app, req), StatusCode::OK);
    let req = TestRequest::get().uri("/api/ping").peer_addr(first).to_request();
    assert_eq!(status_of!(&app, req), StatusCode::TOO_MANY_REQUESTS);

    let req = TestRequest::get().uri("/api/ping").peer_addr(second).to_request();
    assert_eq!(status_of!(&app, req), StatusCode::OK);
}

#[test]
fn test_rate_limit_config_rejects_zero() {
    assert!(build_rate_limit_config(&rate_limit(0)).is_err());
}
