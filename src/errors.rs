use std::fmt;

#[derive(Debug, Clone)]
pub enum FootprintError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Validation(String),
    NotFound(String),
    VisitorNotFound(String),
    SessionTooShort(String),
    InvalidDevice(String),
    Serialization(String),
    Network(String),
    Internal(String),
}

impl FootprintError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            FootprintError::DatabaseConfig(_) => "E001",
            FootprintError::DatabaseConnection(_) => "E002",
            FootprintError::DatabaseOperation(_) => "E003",
            FootprintError::FileOperation(_) => "E004",
            FootprintError::Validation(_) => "E005",
            FootprintError::NotFound(_) => "E006",
            FootprintError::VisitorNotFound(_) => "E007",
            FootprintError::Serialization(_) => "E008",
            FootprintError::Network(_) => "E009",
            FootprintError::Internal(_) => "E010",
            FootprintError::SessionTooShort(_) => "E011",
            FootprintError::InvalidDevice(_) => "E012",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            FootprintError::DatabaseConfig(_) => "Database Configuration Error",
            FootprintError::DatabaseConnection(_) => "Database Connection Error",
            FootprintError::DatabaseOperation(_) => "Database Operation Error",
            FootprintError::FileOperation(_) => "File Operation Error",
            FootprintError::Validation(_) => "Validation Error",
            FootprintError::NotFound(_) => "Resource Not Found",
            FootprintError::VisitorNotFound(_) => "Visitor Not Found",
            FootprintError::SessionTooShort(_) => "Session Too Short",
            FootprintError::InvalidDevice(_) => "Invalid Device",
            FootprintError::Serialization(_) => "Serialization Error",
            FootprintError::Network(_) => "Network Error",
            FootprintError::Internal(_) => "Internal Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            FootprintError::DatabaseConfig(msg)
            | FootprintError::DatabaseConnection(msg)
            | FootprintError::DatabaseOperation(msg)
            | FootprintError::FileOperation(msg)
            | FootprintError::Validation(msg)
            | FootprintError::NotFound(msg)
            | FootprintError::VisitorNotFound(msg)
            | FootprintError::SessionTooShort(msg)
            | FootprintError::InvalidDevice(msg)
            | FootprintError::Serialization(msg)
            | FootprintError::Network(msg)
            | FootprintError::Internal(msg) => msg,
        }
    }

    /// 映射为 HTTP 状态码
    ///
    /// 存储层错误一律 500，详情只写日志，不回传给调用方。
    pub fn http_status(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            FootprintError::Validation(_)
            | FootprintError::SessionTooShort(_)
            | FootprintError::InvalidDevice(_)
            | FootprintError::Serialization(_) => StatusCode::BAD_REQUEST,
            FootprintError::NotFound(_) | FootprintError::VisitorNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            FootprintError::Network(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 是否属于服务端内部错误（对外只返回通用信息）
    pub fn is_server_error(&self) -> bool {
        self.http_status().is_server_error()
    }

    /// 格式化为彩色输出（用于 Server 模式）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for FootprintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for FootprintError {}

// 便捷的构造函数
impl FootprintError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        FootprintError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        FootprintError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        FootprintError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        FootprintError::FileOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        FootprintError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        FootprintError::NotFound(msg.into())
    }

    pub fn visitor_not_found<T: Into<String>>(msg: T) -> Self {
        FootprintError::VisitorNotFound(msg.into())
    }

    pub fn session_too_short<T: Into<String>>(msg: T) -> Self {
        FootprintError::SessionTooShort(msg.into())
    }

    pub fn invalid_device<T: Into<String>>(msg: T) -> Self {
        FootprintError::InvalidDevice(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        FootprintError::Serialization(msg.into())
    }

    pub fn network<T: Into<String>>(msg: T) -> Self {
        FootprintError::Network(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        FootprintError::Internal(msg.into())
    }
}

impl From<sea_orm::DbErr> for FootprintError {
    fn from(err: sea_orm::DbErr) -> Self {
        FootprintError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for FootprintError {
    fn from(err: std::io::Error) -> Self {
        FootprintError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for FootprintError {
    fn from(err: serde_json::Error) -> Self {
        FootprintError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FootprintError>;
