//! HTTP timing middleware
//!
//! 记录每个请求的耗时；超过阈值的慢请求以 warn 级别输出。

use actix_service::{Service, Transform};
use actix_web::{
    Error,
    dev::{ServiceRequest, ServiceResponse},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_millis(500);

/// HTTP timing middleware factory
#[derive(Clone)]
pub struct TimingMiddleware {
    slow_threshold: Duration,
}

impl TimingMiddleware {
    pub fn with_threshold(slow_threshold: Duration) -> Self {
        Self { slow_threshold }
    }
}

impl Default for TimingMiddleware {
    fn default() -> Self {
        Self::with_threshold(DEFAULT_SLOW_THRESHOLD)
    }
}

impl<S, B> Transform<S, ServiceRequest> for TimingMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TimingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TimingService {
            service: Rc::new(service),
            slow_threshold: self.slow_threshold,
        }))
    }
}

pub struct TimingService<S> {
    service: Rc<S>,
    slow_threshold: Duration,
}

impl<S, B> Service<ServiceRequest> for TimingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let slow_threshold = self.slow_threshold;
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.path().to_string();

        Box::pin(async move {
            let result = srv.call(req).await;
            let elapsed = start.elapsed();
            let status = match &result {
                Ok(response) => response.status().as_u16(),
                Err(e) => e.as_response_error().status_code().as_u16(),
            };

            if elapsed >= slow_threshold {
                warn!(
                    "Slow request: {} {} -> {} in {:.1}ms",
                    method,
                    path,
                    status,
                    elapsed.as_secs_f64() * 1000.0
                );
            } else {
                debug!(
                    "{} {} -> {} in {:.1}ms",
                    method,
                    path,
                    status,
                    elapsed.as_secs_f64() * 1000.0
                );
            }

            result
        })
    }
}
