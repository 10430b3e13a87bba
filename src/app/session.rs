// ==========================================
// 配方库存核对系统 - 会话上下文
// ==========================================
// 职责: 持有当前登录会话, 进程启动时构造一次, 以 Arc 共享给各 API
// 持久化: 可选 SessionStore（CLI 使用 client_session 表）
// 红线: API 层只通过本上下文取令牌, 不做全局查找
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator;
use crate::backend::error::BackendError;
use crate::backend::transport::{LoginOutcome, PlanningBackend};
use crate::domain::user::{Credentials, Session};
use crate::i18n::t;
use crate::repository::error::RepositoryResult;
use std::sync::{Arc, RwLock};
use tracing::{info, instrument, warn};

// ==========================================
// SessionStore - 会话持久化接口
// ==========================================
pub trait SessionStore: Send + Sync {
    fn load(&self) -> RepositoryResult<Option<Session>>;
    fn save(&self, session: &Session) -> RepositoryResult<()>;
    fn clear(&self) -> RepositoryResult<()>;
}

// ==========================================
// SessionContext
// ==========================================
pub struct SessionContext {
    backend: Arc<dyn PlanningBackend>,
    store: Option<Arc<dyn SessionStore>>,
    current: RwLock<Option<Session>>,
}

/// 服务器返回的登录失败消息是否属于凭据错误
fn is_credential_failure(err: &BackendError) -> bool {
    match err {
        BackendError::Unauthorized(_) => true,
        BackendError::Server { message, .. } | BackendError::NotFound(message) => {
            let m = message.to_lowercase();
            m.contains("invalid") || m.contains("incorrect") || m.contains("password")
        }
        _ => false,
    }
}

fn map_login_error(err: BackendError) -> ApiError {
    if is_credential_failure(&err) {
        ApiError::Unauthorized(t("errors.invalid_credentials"))
    } else {
        ApiError::from(err)
    }
}

impl SessionContext {
    pub fn new(backend: Arc<dyn PlanningBackend>) -> Self {
        Self {
            backend,
            store: None,
            current: RwLock::new(None),
        }
    }

    pub fn with_store(backend: Arc<dyn PlanningBackend>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            backend,
            store: Some(store),
            current: RwLock::new(None),
        }
    }

    fn read(&self) -> ApiResult<Option<Session>> {
        self.current
            .read()
            .map(|guard| guard.clone())
            .map_err(|e| ApiError::InternalError(format!("会话锁获取失败: {}", e)))
    }

    fn replace(&self, session: Option<Session>) -> ApiResult<()> {
        let mut guard = self
            .current
            .write()
            .map_err(|e| ApiError::InternalError(format!("会话锁获取失败: {}", e)))?;
        *guard = session;
        Ok(())
    }

    fn establish(&self, outcome: LoginOutcome, is_admin: bool) -> ApiResult<Session> {
        let session = Session::new(outcome.token, outcome.user, is_admin);
        if let Some(store) = &self.store {
            store.save(&session)?;
        }
        self.replace(Some(session.clone()))?;
        info!(user = %session.user.username, is_admin, "登录成功");
        Ok(session)
    }

    // ==========================================
    // 登录 / 登出
    // ==========================================

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<Session> {
        validator::validate_login(username, password)?;
        let outcome = self
            .backend
            .login(&Credentials::new(username, password))
            .await
            .map_err(map_login_error)?;
        self.establish(outcome, false)
    }

    #[instrument(skip(self, password))]
    pub async fn admin_login(&self, username: &str, password: &str) -> ApiResult<Session> {
        validator::validate_admin_login(username, password)?;
        let outcome = self
            .backend
            .admin_login(&Credentials::new(username, password))
            .await
            .map_err(map_login_error)?;
        self.establish(outcome, true)
    }

    /// 清除会话; 返回被清除的会话
    pub fn logout(&self) -> ApiResult<Option<Session>> {
        let previous = self.read()?;
        if let Some(store) = &self.store {
            store.clear()?;
        }
        self.replace(None)?;
        if let Some(s) = &previous {
            info!(user = %s.user.username, "已登出");
        }
        Ok(previous)
    }

    // ==========================================
    // 查询与守卫
    // ==========================================

    pub fn current(&self) -> ApiResult<Option<Session>> {
        self.read()
    }

    pub fn require(&self) -> ApiResult<Session> {
        self.read()?
            .ok_or_else(|| ApiError::Unauthorized(t("errors.not_logged_in")))
    }

    /// 管理员入口登录, 或账号本身为 ADMIN
    pub fn require_admin(&self) -> ApiResult<Session> {
        let session = self.require()?;
        if session.is_admin || session.user.is_admin() {
            Ok(session)
        } else {
            Err(ApiError::Forbidden(t("errors.admin_required")))
        }
    }

    /// 审计日志中的操作人; 未登录时为 "anonymous"
    pub fn actor(&self) -> String {
        match self.read() {
            Ok(Some(s)) => s.actor().to_string(),
            _ => "anonymous".to_string(),
        }
    }

    /// 从持久化存储恢复会话（不校验令牌）
    pub fn restore(&self) -> ApiResult<Option<Session>> {
        let Some(store) = &self.store else {
            return self.read();
        };
        let loaded = store.load()?;
        self.replace(loaded.clone())?;
        Ok(loaded)
    }

    /// GET /users/verify-token, 用服务器返回的用户刷新会话
    ///
    /// 令牌失效时清除会话并返回 Unauthorized
    #[instrument(skip(self))]
    pub async fn refresh_user(&self) -> ApiResult<Session> {
        let mut session = self.require()?;
        match self.backend.verify_token(&session.token).await {
            Ok(user) => {
                session.user = user;
                if let Some(store) = &self.store {
                    store.save(&session)?;
                }
                self.replace(Some(session.clone()))?;
                Ok(session)
            }
            Err(BackendError::Unauthorized(msg)) => {
                warn!(message = %msg, "令牌已失效, 清除会话");
                self.logout()?;
                Err(ApiError::Unauthorized(t("errors.not_logged_in")))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_failure_detection() {
        assert!(is_credential_failure(&BackendError::Unauthorized("x".to_string())));
        assert!(is_credential_failure(&BackendError::Server {
            status: 400,
            message: "Incorrect password".to_string(),
        }));
        assert!(!is_credential_failure(&BackendError::Server {
            status: 500,
            message: "Database down".to_string(),
        }));
        assert!(!is_credential_failure(&BackendError::Timeout("10s".to_string())));
    }
}
