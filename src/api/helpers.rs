//! API 帮助函数

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::Serialize;
use tracing::error;

use crate::errors::MarketviewError;

use super::error_code::ErrorCode;
use super::types::ApiResponse;

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// 从 MarketviewError 构建错误响应
///
/// 5xx 只返回通用消息，细节写入日志。
pub fn error_from_marketview(err: &MarketviewError) -> HttpResponse {
    let status = err.http_status();
    let error_code = ErrorCode::from(err);

    if status == StatusCode::SERVICE_UNAVAILABLE {
        error!("{}", err.format_simple());
        return error_response(status, error_code, "Service temporarily unavailable, retry later");
    }
    if status.is_server_error() {
        error!("{}", err.format_simple());
        return error_response(status, error_code, "Internal server error");
    }
    error_response(status, error_code, err.message())
}

/// 统一 Result → HttpResponse 转换
pub fn api_result<T, E>(result: Result<T, E>) -> HttpResponse
where
    T: Serialize,
    E: Into<MarketviewError>,
{
    match result {
        Ok(data) => success_response(data),
        Err(e) => {
            let err: MarketviewError = e.into();
            error_from_marketview(&err)
        }
    }
}
