// ==========================================
// 配方库存核对系统 - 用户与会话领域模型
// ==========================================
// 用户数据全部来自后端 /users 接口；本地只保存当前会话
// ==========================================

use crate::domain::types::UserRole;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// User - 系统用户
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    pub last_name: String,
    pub employee_id: Option<String>,
    pub role: UserRole,
    pub birth_date: Option<NaiveDate>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.name, self.last_name).trim().to_string()
    }

    /// 用户列表搜索: 用户名/姓名大小写不敏感，工号按原样包含匹配
    pub fn matches_search(&self, search: &str) -> bool {
        if search.is_empty() {
            return true;
        }
        let term = search.to_lowercase();
        self.username.to_lowercase().contains(&term)
            || self.name.to_lowercase().contains(&term)
            || self.last_name.to_lowercase().contains(&term)
            || self
                .employee_id
                .as_deref()
                .map_or(false, |id| id.contains(search))
    }
}

// ==========================================
// Credentials - 登录凭据
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.trim().to_string(),
            password: password.to_string(),
        }
    }
}

// ==========================================
// NewUser - 管理员创建用户（POST /users/admin/create-user）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDateTime, // 序列化为 ISO 时间戳
    pub employee_id: i64,
    pub role: UserRole,
}

// ==========================================
// UserUpdate - 编辑用户（PUT /users/{id}）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
}

// ==========================================
// PasswordReset - 管理员重置密码
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordReset {
    pub username: String,
    pub birth_date: NaiveDate,
    pub employee_id: String,
    pub new_password: String,
    pub confirm_password: String,
}

// ==========================================
// Session - 当前登录会话
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub is_admin: bool, // 通过管理员登录入口获得
    pub logged_in_at: NaiveDateTime,
}

impl Session {
    pub fn new(token: String, user: User, is_admin: bool) -> Self {
        Self {
            token,
            user,
            is_admin,
            logged_in_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// 审计日志中的操作人
    pub fn actor(&self) -> &str {
        &self.user.username
    }
}
