//! Admin API 服务模块
//!
//! 聚合统计端点、错误码、统一响应帮助函数。

pub mod analytics;
pub mod error_code;
mod helpers;
pub mod routes;
mod types;

pub use types::*;

pub use helpers::{
    GENERIC_SERVER_ERROR, JSON_PAYLOAD_LIMIT, api_result, error_from_footprint, error_response,
    json_config, ok_response, success_response,
};

pub use error_code::ErrorCode;

pub use routes::{admin_scope, analytics_routes};
