//! `/api` 按客户端 IP 限流
//!
//! 令牌桶：窗口内最多 `max_requests` 次（突发），令牌按 `window / max_requests` 匀速补充。
//! 超限返回 429，响应体与其他 API 错误一样是 `ErrorBody` 信封。

use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError,
};
use actix_web::dev::ServiceRequest;
use actix_web::{HttpResponse, HttpResponseBuilder};
use governor::NotUntil;
use governor::clock::{Clock, DefaultClock, QuantaInstant};
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::api::services::admin::{ErrorBody, ErrorCode};
use crate::config::RateLimitConfig;
use crate::errors::{FootprintError, Result};
use crate::utils::ip::resolve_client_ip;

/// 基于客户端 IP 的限流 key 提取器
///
/// 仅当连接来自可信代理（或未配置时来自私有地址）才使用转发头。
#[derive(Clone)]
pub struct ClientIpKeyExtractor {
    trusted_proxies: Arc<Vec<String>>,
}

impl ClientIpKeyExtractor {
    pub fn new(trusted_proxies: Vec<String>) -> Self {
        Self {
            trusted_proxies: Arc::new(trusted_proxies),
        }
    }
}

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(
        &self,
        req: &ServiceRequest,
    ) -> std::result::Result<Self::Key, Self::KeyExtractionError> {
        let conn_info = req.connection_info();
        resolve_client_ip(&conn_info, req.headers(), &self.trusted_proxies)
            .ok_or_else(|| SimpleKeyExtractionError::new("Unable to extract client IP"))
    }

    fn exceed_rate_limit_response(
        &self,
        negative: &NotUntil<QuantaInstant>,
        mut response: HttpResponseBuilder,
    ) -> HttpResponse {
        let wait_secs = negative
            .wait_time_from(DefaultClock::default().now())
            .as_secs();
        response
            .append_header(("Content-Type", "application/json; charset=utf-8"))
            .json(ErrorBody::new(
                ErrorCode::RateLimitExceeded,
                format!("Too many requests, retry in {}s", wait_secs),
            ))
    }
}

pub type ApiRateLimitConfig = GovernorConfig<ClientIpKeyExtractor, NoOpMiddleware>;

/// 令牌补充间隔，至少 1ms
pub fn replenish_period(config: &RateLimitConfig) -> Duration {
    let window = Duration::from_secs(config.window_secs);
    let per_request = window / config.max_requests.max(1);
    per_request.max(Duration::from_millis(1))
}

/// 构建限流配置
///
/// 多个 worker 用同一份配置创建 `Governor`，共享同一个计数器。
pub fn build_rate_limit_config(config: &RateLimitConfig) -> Result<ApiRateLimitConfig> {
    if config.max_requests == 0 || config.window_secs == 0 {
        return Err(FootprintError::validation(
            "rate_limit.max_requests and rate_limit.window_secs must be positive",
        ));
    }

    let period = replenish_period(config);
    let governor_config = GovernorConfigBuilder::default()
        .period(period)
        .burst_size(config.max_requests)
        .key_extractor(ClientIpKeyExtractor::new(config.trusted_proxies.clone()))
        .finish()
        .ok_or_else(|| FootprintError::validation("Invalid rate limit configuration"))?;

    debug!(
        "API rate limiter: burst {} per {}s window, one token every {:?}",
        config.max_requests, config.window_secs, period
    );
    Ok(governor_config)
}

pub fn api_rate_limiter(
    config: &ApiRateLimitConfig,
) -> Governor<ClientIpKeyExtractor, NoOpMiddleware> {
    Governor::new(config)
}
