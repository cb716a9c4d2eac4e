//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::MarketviewError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字，按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 3000-3099: 浏览统计错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    NotFound = 1004,
    InternalServerError = 1005,
    ServiceUnavailable = 1030,

    // 浏览统计错误 3000-3099
    EntityNotFound = 3000,
    InvalidEntityId = 3001,
    ViewStorageError = 3002,
}

impl From<&MarketviewError> for ErrorCode {
    fn from(err: &MarketviewError) -> Self {
        match err {
            MarketviewError::Validation(_) => ErrorCode::InvalidEntityId,
            MarketviewError::NotFound(_) => ErrorCode::EntityNotFound,
            MarketviewError::Transient(_) => ErrorCode::ServiceUnavailable,
            MarketviewError::Storage(_) | MarketviewError::DatabaseConnection(_) => {
                ErrorCode::ViewStorageError
            }
            _ => ErrorCode::InternalServerError,
        }
    }
}
