//! API 帮助函数

use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;
use tracing::error;

use crate::errors::FootprintError;

use super::error_code::ErrorCode;
use super::types::{ErrorBody, SuccessBody};

/// JSON 请求体上限
pub const JSON_PAYLOAD_LIMIT: usize = 64 * 1024;

/// 对外的通用服务端错误信息（详情只写日志）
pub const GENERIC_SERVER_ERROR: &str = "Server error";

/// 构建成功响应（原样输出数据）
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok()
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(data)
}

/// 采集端点的 `{success: true}`
pub fn ok_response() -> HttpResponse {
    success_response(SuccessBody::ok())
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ErrorBody::new(error_code, message))
}

/// 从 FootprintError 构建错误响应
///
/// 5xx 只返回通用信息，错误详情写入日志。
pub fn error_from_footprint(err: &FootprintError) -> HttpResponse {
    let status = err.http_status();
    let error_code = ErrorCode::from(err);
    if err.is_server_error() {
        error!("Request failed: {}", err);
        error_response(status, error_code, GENERIC_SERVER_ERROR)
    } else {
        error_response(status, error_code, err.message())
    }
}

/// 统一 Result → HttpResponse 转换
pub fn api_result<T, E>(result: Result<T, E>) -> HttpResponse
where
    T: Serialize,
    E: Into<FootprintError>,
{
    match result {
        Ok(data) => success_response(data),
        Err(e) => {
            let err: FootprintError = e.into();
            error_from_footprint(&err)
        }
    }
}

/// JSON 提取器配置：超限 / 格式错误 / 缺字段统一返回 400 信封
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_PAYLOAD_LIMIT)
        .error_handler(json_error_handler)
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let (status, code) = match &err {
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
            (StatusCode::PAYLOAD_TOO_LARGE, ErrorCode::PayloadTooLarge)
        }
        _ => (StatusCode::BAD_REQUEST, ErrorCode::BadRequest),
    };
    let message = format!("Invalid JSON body: {}", err);
    let response = error_response(status, code, &message);
    InternalError::from_response(err, response).into()
}
