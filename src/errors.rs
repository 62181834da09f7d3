use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

/// 定位流程中的错误
///
/// 变体内携带的字符串只用于服务端日志（上游状态码、解析错误等），
/// 返回给调用方的始终是 [`GeoDetectError::message`] 的固定文案，
/// 任何变体都不允许包含 provider 凭证。
#[derive(Debug, Clone)]
pub enum GeoDetectError {
    MissingClientAddress(String),
    MissingCredential(String),
    ProviderUnavailable(String),
    ProviderMalformedResponse(String),
}

impl GeoDetectError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            GeoDetectError::MissingClientAddress(_) => "E001",
            GeoDetectError::MissingCredential(_) => "E002",
            GeoDetectError::ProviderUnavailable(_) => "E003",
            GeoDetectError::ProviderMalformedResponse(_) => "E004",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            GeoDetectError::MissingClientAddress(_) => "Missing Client Address",
            GeoDetectError::MissingCredential(_) => "Missing Credential",
            GeoDetectError::ProviderUnavailable(_) => "Provider Unavailable",
            GeoDetectError::ProviderMalformedResponse(_) => "Provider Malformed Response",
        }
    }

    /// 对外展示的错误文案
    pub fn message(&self) -> &'static str {
        match self {
            GeoDetectError::MissingClientAddress(_) => "Unable to determine client IP address",
            GeoDetectError::MissingCredential(_) => "Geolocation provider is not configured",
            GeoDetectError::ProviderUnavailable(_) => "Failed to fetch geolocation",
            GeoDetectError::ProviderMalformedResponse(_) => {
                "Geolocation provider returned an invalid response"
            }
        }
    }

    /// 错误详情（仅用于日志）
    pub fn detail(&self) -> &str {
        match self {
            GeoDetectError::MissingClientAddress(msg) => msg,
            GeoDetectError::MissingCredential(msg) => msg,
            GeoDetectError::ProviderUnavailable(msg) => msg,
            GeoDetectError::ProviderMalformedResponse(msg) => msg,
        }
    }

    /// 映射到 HTTP 状态码
    pub fn http_status(&self) -> StatusCode {
        match self {
            GeoDetectError::MissingClientAddress(_) => StatusCode::BAD_REQUEST,
            GeoDetectError::MissingCredential(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GeoDetectError::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            GeoDetectError::ProviderMalformedResponse(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.detail())
    }
}

impl fmt::Display for GeoDetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for GeoDetectError {}

// 便捷的构造函数
impl GeoDetectError {
    pub fn missing_client_address<T: Into<String>>(msg: T) -> Self {
        GeoDetectError::MissingClientAddress(msg.into())
    }

    pub fn missing_credential<T: Into<String>>(msg: T) -> Self {
        GeoDetectError::MissingCredential(msg.into())
    }

    pub fn provider_unavailable<T: Into<String>>(msg: T) -> Self {
        GeoDetectError::ProviderUnavailable(msg.into())
    }

    pub fn provider_malformed_response<T: Into<String>>(msg: T) -> Self {
        GeoDetectError::ProviderMalformedResponse(msg.into())
    }
}

impl From<serde_json::Error> for GeoDetectError {
    fn from(err: serde_json::Error) -> Self {
        GeoDetectError::ProviderMalformedResponse(err.to_string())
    }
}

/// JSON 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

impl ResponseError for GeoDetectError {
    fn status_code(&self) -> StatusCode {
        self.http_status()
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.http_status())
            .append_header(("Content-Type", "application/json; charset=utf-8"))
            .json(ErrorBody {
                error: self.message().to_string(),
                code: self.code(),
            })
    }
}

pub type Result<T> = std::result::Result<T, GeoDetectError>;
