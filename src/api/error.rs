// ==========================================
// 配方库存核对系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型, 把后端/仓储/导入/导出错误
//       转换为用户可读的错误消息
// ==========================================

use crate::backend::error::BackendError;
use crate::export::ExportError;
use crate::i18n::t;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入与业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    /// 表单校验失败（逐字段原因）
    #[error("数据验证失败: {message}")]
    ValidationError {
        message: String,
        violations: Vec<FieldViolation>,
    },

    /// 原料不足, 禁止提交生产计划
    #[error("原料不足: {}", codes.join(", "))]
    InsufficientStock { codes: Vec<String> },

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("没有可导出的数据: {0}")]
    NothingToExport(String),

    // ==========================================
    // 身份与权限
    // ==========================================
    #[error("未授权: {0}")]
    Unauthorized(String),

    #[error("无权限: {0}")]
    Forbidden(String),

    // ==========================================
    // 远端服务
    // ==========================================
    #[error("网络错误: {0}")]
    Network(String),

    /// 服务器拒绝请求（附服务器消息）
    #[error("服务器错误: {0}")]
    Backend(String),

    // ==========================================
    // 本地资源
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("文件导出失败: {0}")]
    ExportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 单字段校验失败
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        ApiError::ValidationError {
            message: message.clone(),
            violations: vec![FieldViolation {
                field: field.to_string(),
                message,
            }],
        }
    }

    /// 多字段校验失败; 为空时返回 None
    pub fn from_violations(violations: Vec<FieldViolation>) -> Option<Self> {
        let first = violations.first()?.message.clone();
        Some(ApiError::ValidationError {
            message: first,
            violations,
        })
    }

    /// 错误代码（CLI / 前端统一使用）
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::NothingToExport(_) => "NOTHING_TO_EXPORT",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Network(_) => "NETWORK_ERROR",
            ApiError::Backend(_) => "BACKEND_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::ImportError(_) => "IMPORT_ERROR",
            ApiError::ExportError(_) => "EXPORT_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "UNKNOWN_ERROR",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let details = match self {
            ApiError::ValidationError { violations, .. } => serde_json::to_value(violations).ok(),
            ApiError::InsufficientStock { codes } => Some(serde_json::json!({ "codes": codes })),
            _ => None,
        };
        ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
            details,
        }
    }
}

// ==========================================
// 从 BackendError 转换
// ==========================================
impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Connection { base_url, message } => {
                ApiError::Network(format!("{} ({}): {}", t("errors.network"), base_url, message))
            }
            BackendError::Timeout(msg) => {
                ApiError::Network(format!("{}: {}", t("errors.network"), msg))
            }
            BackendError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            BackendError::NotFound(msg) => ApiError::NotFound(msg),
            BackendError::Server { status, message } => {
                if message.is_empty() {
                    ApiError::Backend(format!("HTTP {}", status))
                } else {
                    ApiError::Backend(message)
                }
            }
            BackendError::Decode(msg) | BackendError::Request(msg) => ApiError::InternalError(msg),
            BackendError::Io(e) => ApiError::ImportError(e.to_string()),
            BackendError::Other(e) => ApiError::Other(e),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::field(&field, message)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseConnectionError(msg)
            | RepositoryError::DatabaseQueryError(msg)
            | RepositoryError::UniqueConstraintViolation(msg) => ApiError::DatabaseError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::FileNotFound(path) => {
                ApiError::NotFound(crate::i18n::t_with_args("errors.file_not_found", &[("path", &path)]))
            }
            ImportError::UnsupportedFormat(_)
            | ImportError::MissingColumn(_)
            | ImportError::NoDataRows
            | ImportError::RowError { .. } => ApiError::InvalidInput(err.to_string()),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Empty(key) => ApiError::NothingToExport(t(key)),
            other => ApiError::ExportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// 校验违规详情
// ==========================================

/// 字段校验违规
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// 对外错误结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_conversion() {
        let err: ApiError = BackendError::Server {
            status: 400,
            message: "Chemical not found".to_string(),
        }
        .into();
        assert!(matches!(&err, ApiError::Backend(m) if m == "Chemical not found"));
        assert_eq!(err.code(), "BACKEND_ERROR");

        let err: ApiError = BackendError::Connection {
            base_url: "http://192.168.10.180:4000".to_string(),
            message: "refused".to_string(),
        }
        .into();
        match err {
            ApiError::Network(msg) => assert!(msg.contains("192.168.10.180:4000")),
            other => panic!("Expected Network, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_response_details() {
        let err = ApiError::from_violations(vec![
            FieldViolation::new("username", "required"),
            FieldViolation::new("password", "too short"),
        ])
        .unwrap();
        let resp = err.to_response();
        assert_eq!(resp.code, "VALIDATION_ERROR");
        assert!(resp.message.contains("required"));
        assert_eq!(resp.details.unwrap().as_array().unwrap().len(), 2);

        assert!(ApiError::from_violations(Vec::new()).is_none());
    }

    #[test]
    fn test_repository_error_conversion() {
        let err: ApiError = RepositoryError::FieldValueError {
            field: "api_timeout_ms".to_string(),
            message: "需要非负整数".to_string(),
        }
        .into();
        match err {
            ApiError::ValidationError { violations, .. } => {
                assert_eq!(violations[0].field, "api_timeout_ms")
            }
            other => panic!("Expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn test_insufficient_stock_message() {
        let err = ApiError::InsufficientStock {
            codes: vec!["CH-01".to_string(), "CH-07".to_string()],
        };
        assert!(err.to_string().contains("CH-01, CH-07"));
        assert!(err.to_response().details.is_some());
    }
}
