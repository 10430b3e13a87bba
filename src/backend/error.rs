// ==========================================
// 配方库存核对系统 - 后端通信错误类型
// ==========================================
// 工具: thiserror 派生宏
// 来源: reqwest 传输错误 / HTTP 非 2xx / 响应体解析失败
// ==========================================

use thiserror::Error;

/// 后端通信错误
#[derive(Error, Debug)]
pub enum BackendError {
    // ===== 网络层 =====
    #[error("无法连接服务器 {base_url}: {message}")]
    Connection { base_url: String, message: String },

    #[error("请求超时: {0}")]
    Timeout(String),

    #[error("请求构造失败: {0}")]
    Request(String),

    // ===== HTTP 层 =====
    #[error("未授权: {0}")]
    Unauthorized(String),

    #[error("资源不存在: {0}")]
    NotFound(String),

    #[error("服务器错误 (status={status}): {message}")]
    Server { status: u16, message: String },

    // ===== 数据层 =====
    #[error("响应解析失败: {0}")]
    Decode(String),

    #[error("文件读取失败: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BackendError {
    /// 服务器返回的可读消息（用于提示用户）
    pub fn server_message(&self) -> Option<&str> {
        match self {
            BackendError::Server { message, .. }
            | BackendError::Unauthorized(message)
            | BackendError::NotFound(message) => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            BackendError::Connection { .. } | BackendError::Timeout(_)
        )
    }

    /// 按 HTTP 状态码归类
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => BackendError::Unauthorized(message),
            404 => BackendError::NotFound(message),
            _ => BackendError::Server { status, message },
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout(err.to_string())
        } else if err.is_connect() {
            let base_url = err
                .url()
                .map(|u| match u.port() {
                    Some(port) => format!("{}://{}:{}", u.scheme(), u.host_str().unwrap_or(""), port),
                    None => format!("{}://{}", u.scheme(), u.host_str().unwrap_or("")),
                })
                .unwrap_or_default();
            BackendError::Connection {
                base_url,
                message: err.to_string(),
            }
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            BackendError::from_status(status.as_u16(), err.to_string())
        } else {
            BackendError::Request(err.to_string())
        }
    }
}

/// 从错误响应体中提取消息: 优先 `error`, 其次 `message`, 否则原文
pub fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                if !msg.is_empty() {
                    return msg.to_string();
                }
            }
        }
    }
    body.trim().to_string()
}

/// Result 类型别名
pub type BackendResult<T> = Result<T, BackendError>;
