// ==========================================
// 配方库存核对系统 - 用户 API
// ==========================================
// 职责: 登录/登出、令牌校验、用户名检查、
//       管理员: 重置密码、创建/查询/编辑/删除用户
// 鉴权: 用户管理接口使用当前会话的 Bearer token
// ==========================================

use std::sync::Arc;
use chrono::NaiveDate;
use serde_json::json;
use tracing::{info, instrument};

use crate::api::audit;
use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{
    self, EditUserForm, RegisterForm, ResetPasswordForm, USERNAME_RULE,
};
use crate::app::session::SessionContext;
use crate::backend::error::BackendError;
use crate::backend::transport::PlanningBackend;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::types::UserRole;
use crate::domain::user::{NewUser, PasswordReset, Session, User, UserUpdate};
use crate::i18n::t;
use crate::repository::action_log_repo::ActionLogRepository;

const USERNAME_NOT_FOUND: &str = "Username not found in our records";

/// 服务器消息是否表示新密码与旧密码相同
fn is_password_reuse(message: &str) -> bool {
    let m = message.to_lowercase();
    if m.contains("reuse") {
        return true;
    }
    m.find("same")
        .map_or(false, |idx| m[idx + "same".len()..].contains("password"))
}

pub struct UserApi {
    backend: Arc<dyn PlanningBackend>,
    session: Arc<SessionContext>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl UserApi {
    pub fn new(
        backend: Arc<dyn PlanningBackend>,
        session: Arc<SessionContext>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            backend,
            session,
            action_log_repo,
        }
    }

    // ==========================================
    // 登录 / 登出
    // ==========================================

    pub async fn login(&self, username: &str, password: &str) -> ApiResult<Session> {
        let session = self.session.login(username, password).await?;
        audit::record(&self.action_log_repo, ActionLog::new(ActionType::Login, session.actor()));
        Ok(session)
    }

    pub async fn admin_login(&self, username: &str, password: &str) -> ApiResult<Session> {
        let session = self.session.admin_login(username, password).await?;
        audit::record(
            &self.action_log_repo,
            ActionLog::new(ActionType::Login, session.actor()).with_detail("admin"),
        );
        Ok(session)
    }

    pub fn logout(&self) -> ApiResult<Option<Session>> {
        let previous = self.session.logout()?;
        if let Some(s) = &previous {
            audit::record(&self.action_log_repo, ActionLog::new(ActionType::Logout, s.actor()));
        }
        Ok(previous)
    }

    /// GET /users/verify-token
    pub async fn whoami(&self) -> ApiResult<User> {
        Ok(self.session.refresh_user().await?.user)
    }

    // ==========================================
    // 重置密码（两步）
    // ==========================================

    /// 第一步: 用户名存在性检查
    pub async fn check_username(&self, username: &str) -> ApiResult<()> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ApiError::field("username", "Username is required"));
        }
        if !validator::is_valid_username(username) {
            return Err(ApiError::field("username", USERNAME_RULE));
        }
        match self.backend.check_username(username).await {
            Ok(true) => Ok(()),
            Ok(false) | Err(BackendError::NotFound(_)) => {
                Err(ApiError::field("username", USERNAME_NOT_FOUND))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 第二步: 管理员重置密码
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn reset_password(&self, form: &ResetPasswordForm, today: NaiveDate) -> ApiResult<()> {
        let session = self.session.require_admin()?;
        validator::validate_reset(form, today)?;
        let Some(birth_date) = form.birth_date else {
            return Err(ApiError::field("birthDate", "Birth date is required"));
        };

        let reset = PasswordReset {
            username: form.username.trim().to_string(),
            birth_date,
            employee_id: form.employee_id.trim().to_string(),
            new_password: form.new_password.clone(),
            confirm_password: form.confirm_password.clone(),
        };
        match self.backend.reset_password(&session.token, &reset).await {
            Ok(()) => {}
            Err(e) => {
                if e.server_message().map_or(false, is_password_reuse) {
                    return Err(ApiError::field("newPassword", t("errors.password_reused")));
                }
                return Err(e.into());
            }
        }

        info!("密码已重置");
        audit::record(
            &self.action_log_repo,
            ActionLog::new(ActionType::ResetPassword, session.actor())
                .with_payload(json!({ "username": reset.username })),
        );
        Ok(())
    }

    // ==========================================
    // 用户管理
    // ==========================================

    /// 管理员创建用户, 角色固定为 USER
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn create_user(&self, form: &RegisterForm) -> ApiResult<NewUser> {
        let session = self.session.require_admin()?;
        validator::validate_register(form)?;

        let employee_id: i64 = form
            .employee_id
            .trim()
            .parse()
            .map_err(|_| ApiError::field("employeeId", "Employee ID must be a number"))?;
        let birth_date = form
            .birth_date
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| ApiError::field("birthDate", "Birth date is required"))?;

        let new_user = NewUser {
            username: form.username.trim().to_string(),
            password: form.password.clone(),
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            birth_date,
            employee_id,
            role: UserRole::User,
        };
        self.backend.create_user(&session.token, &new_user).await?;

        info!("用户已创建");
        audit::record(
            &self.action_log_repo,
            ActionLog::new(ActionType::CreateUser, session.actor())
                .with_payload(json!({ "username": new_user.username, "employee_id": employee_id })),
        );
        Ok(new_user)
    }

    /// 搜索词匹配用户名/姓名/工号, 可选按角色过滤
    pub async fn list_users(&self, search: &str, role: Option<UserRole>) -> ApiResult<Vec<User>> {
        let session = self.session.require_admin()?;
        let users = self.backend.list_users(&session.token).await?;
        Ok(users
            .into_iter()
            .filter(|u| u.matches_search(search))
            .filter(|u| role.map_or(true, |r| u.role == r))
            .collect())
    }

    #[instrument(skip(self, form))]
    pub async fn update_user(&self, id: &str, form: &EditUserForm, today: NaiveDate) -> ApiResult<User> {
        let session = self.session.require_admin()?;
        let role = validator::validate_edit_user(form, today)?;

        let update = UserUpdate {
            name: Some(form.name.trim().to_string()),
            last_name: Some(form.last_name.trim().to_string()),
            employee_id: Some(form.employee_id.trim().to_string()),
            role: Some(role),
            birth_date: form.birth_date,
        };
        let user = self.backend.update_user(&session.token, id, &update).await?;

        audit::record(
            &self.action_log_repo,
            ActionLog::new(ActionType::UpdateUser, session.actor())
                .with_payload(json!({ "id": id, "role": role.to_string() })),
        );
        Ok(user)
    }

    /// 管理员不能删除自己, 也不能删除 ADMIN 账号
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: &str) -> ApiResult<()> {
        let session = self.session.require_admin()?;
        if session.user.id == id {
            return Err(ApiError::Forbidden(t("errors.cannot_delete_self")));
        }

        let users = self.backend.list_users(&session.token).await?;
        let target = users
            .iter()
            .find(|u| u.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("User not found: {}", id)))?;
        if target.is_admin() {
            return Err(ApiError::Forbidden(t("errors.cannot_delete_admin")));
        }

        self.backend.delete_user(&session.token, id).await?;
        info!(username = %target.username, "用户已删除");
        audit::record(
            &self.action_log_repo,
            ActionLog::new(ActionType::DeleteUser, session.actor())
                .with_payload(json!({ "id": id, "username": target.username })),
        );
        Ok(())
    }
}
