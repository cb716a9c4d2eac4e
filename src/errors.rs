use std::fmt;

#[derive(Debug, Clone)]
pub enum MarketviewError {
    Validation(String),
    NotFound(String),
    Transient(String),
    Storage(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    Serialization(String),
    Config(String),
}

impl MarketviewError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            MarketviewError::Validation(_) => "E001",
            MarketviewError::NotFound(_) => "E002",
            MarketviewError::Transient(_) => "E003",
            MarketviewError::Storage(_) => "E004",
            MarketviewError::DatabaseConfig(_) => "E005",
            MarketviewError::DatabaseConnection(_) => "E006",
            MarketviewError::Serialization(_) => "E007",
            MarketviewError::Config(_) => "E008",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            MarketviewError::Validation(_) => "Validation Error",
            MarketviewError::NotFound(_) => "Resource Not Found",
            MarketviewError::Transient(_) => "Transient Storage Error",
            MarketviewError::Storage(_) => "Storage Error",
            MarketviewError::DatabaseConfig(_) => "Database Configuration Error",
            MarketviewError::DatabaseConnection(_) => "Database Connection Error",
            MarketviewError::Serialization(_) => "Serialization Error",
            MarketviewError::Config(_) => "Configuration Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            MarketviewError::Validation(msg)
            | MarketviewError::NotFound(msg)
            | MarketviewError::Transient(msg)
            | MarketviewError::Storage(msg)
            | MarketviewError::DatabaseConfig(msg)
            | MarketviewError::DatabaseConnection(msg)
            | MarketviewError::Serialization(msg)
            | MarketviewError::Config(msg) => msg,
        }
    }

    /// Lock timeouts, deadlocks and dropped connections leave no partial
    /// effect behind, so the whole operation may be replayed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MarketviewError::Transient(_))
    }

    /// HTTP 状态码映射
    pub fn http_status(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            MarketviewError::Validation(_) => StatusCode::BAD_REQUEST,
            MarketviewError::NotFound(_) => StatusCode::NOT_FOUND,
            MarketviewError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
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

impl fmt::Display for MarketviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for MarketviewError {}

// 便捷的构造函数
impl MarketviewError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        MarketviewError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        MarketviewError::NotFound(msg.into())
    }

    pub fn transient<T: Into<String>>(msg: T) -> Self {
        MarketviewError::Transient(msg.into())
    }

    pub fn storage<T: Into<String>>(msg: T) -> Self {
        MarketviewError::Storage(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        MarketviewError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        MarketviewError::DatabaseConnection(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        MarketviewError::Serialization(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        MarketviewError::Config(msg.into())
    }
}

// 数据库错误按是否可重试分类
impl From<sea_orm::DbErr> for MarketviewError {
    fn from(err: sea_orm::DbErr) -> Self {
        if crate::storage::retry::is_retryable_error(&err) {
            MarketviewError::Transient(err.to_string())
        } else {
            MarketviewError::Storage(err.to_string())
        }
    }
}

impl From<serde_json::Error> for MarketviewError {
    fn from(err: serde_json::Error) -> Self {
        MarketviewError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MarketviewError>;
