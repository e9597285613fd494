//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};
use ts_rs::TS;

use crate::analytics::TS_EXPORT_PATH;
use crate::errors::FootprintError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字，ts-rs 生成 TypeScript 类型。
/// 按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证 / 限流
/// - 3000-3099: 采集错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[ts(rename = "ErrorCode")]
#[ts(repr(enum))]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    Unauthorized = 1001,
    NotFound = 1004,
    InternalServerError = 1005,
    PayloadTooLarge = 1011,
    ServiceUnavailable = 1030,

    // 认证 / 限流 2000-2099
    RateLimitExceeded = 2004,

    // 采集错误 3000-3099
    VisitorNotFound = 3000,
    SessionTooShort = 3001,
    InvalidDevice = 3002,
}

impl From<&FootprintError> for ErrorCode {
    fn from(err: &FootprintError) -> Self {
        match err {
            FootprintError::Validation(_) | FootprintError::Serialization(_) => {
                ErrorCode::BadRequest
            }
            FootprintError::NotFound(_) => ErrorCode::NotFound,
            FootprintError::VisitorNotFound(_) => ErrorCode::VisitorNotFound,
            FootprintError::SessionTooShort(_) => ErrorCode::SessionTooShort,
            FootprintError::InvalidDevice(_) => ErrorCode::InvalidDevice,
            FootprintError::Network(_) => ErrorCode::ServiceUnavailable,
            FootprintError::DatabaseConfig(_)
            | FootprintError::DatabaseConnection(_)
            | FootprintError::DatabaseOperation(_)
            | FootprintError::FileOperation(_)
            | FootprintError::Internal(_) => ErrorCode::InternalServerError,
        }
    }
}

impl From<FootprintError> for ErrorCode {
    fn from(err: FootprintError) -> Self {
        ErrorCode::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_number() {
        assert_eq!(serde_json::to_string(&ErrorCode::VisitorNotFound).unwrap(), "3000");
        assert_eq!(serde_json::to_string(&ErrorCode::Success).unwrap(), "0");
    }

    #[test]
    fn test_maps_from_footprint_error() {
        assert_eq!(
            ErrorCode::from(FootprintError::validation("x")),
            ErrorCode::BadRequest
        );
        assert_eq!(
            ErrorCode::from(FootprintError::visitor_not_found("v")),
            ErrorCode::VisitorNotFound
        );
        assert_eq!(
            ErrorCode::from(FootprintError::session_too_short("3s")),
            ErrorCode::SessionTooShort
        );
        assert_eq!(
            ErrorCode::from(FootprintError::invalid_device("Watch")),
            ErrorCode::InvalidDevice
        );
        assert_eq!(
            ErrorCode::from(FootprintError::database_operation("x")),
            ErrorCode::InternalServerError
        );
    }
}
