pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod timing;

pub use auth::AdminAuth;
pub use rate_limit::{
    ApiRateLimitConfig, ClientIpKeyExtractor, api_rate_limiter, build_rate_limit_config,
};
pub use request_id::{RequestId, RequestIdMiddleware};
pub use timing::TimingMiddleware;
