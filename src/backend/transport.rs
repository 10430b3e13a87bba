// ==========================================
// 配方库存核对系统 - 后端传输接口
// ==========================================
// 职责: 定义与规划后端 REST 服务交互的全部操作
// 实现: HttpBackend (reqwest); 测试中使用内存实现
// 约定: 返回值已经过 wire::normalize, 上层不接触原始 JSON
// ==========================================

use crate::backend::error::BackendResult;
use crate::domain::formula::{FormulaBatch, FormulaLine};
use crate::domain::inventory::{StockAdjustment, StockRow};
use crate::domain::plan::{PlanSubmission, PlanningRecord};
use crate::domain::types::Remark;
use crate::domain::user::{Credentials, NewUser, PasswordReset, User, UserUpdate};
use async_trait::async_trait;

/// 登录成功结果
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub token: String,
    pub user: User,
}

// ==========================================
// PlanningBackend - 后端接口
// ==========================================
// 用户管理类接口需要 Bearer token; 库存/配方/计划接口不带鉴权头
#[async_trait]
pub trait PlanningBackend: Send + Sync {
    // ===== 用户 =====

    /// POST /users/login
    async fn login(&self, credentials: &Credentials) -> BackendResult<LoginOutcome>;

    /// POST /users/admin/login
    async fn admin_login(&self, credentials: &Credentials) -> BackendResult<LoginOutcome>;

    /// GET /users/verify-token
    async fn verify_token(&self, token: &str) -> BackendResult<User>;

    /// POST /users/check-username
    async fn check_username(&self, username: &str) -> BackendResult<bool>;

    /// POST /users/admin/reset-password
    async fn reset_password(&self, token: &str, reset: &PasswordReset) -> BackendResult<()>;

    /// POST /users/admin/create-user
    async fn create_user(&self, token: &str, user: &NewUser) -> BackendResult<()>;

    /// GET /users
    async fn list_users(&self, token: &str) -> BackendResult<Vec<User>>;

    /// PUT /users/{id}
    async fn update_user(&self, token: &str, id: &str, update: &UserUpdate)
        -> BackendResult<User>;

    /// DELETE /users/{id}
    async fn delete_user(&self, token: &str, id: &str) -> BackendResult<()>;

    // ===== 原料库存 =====

    /// GET /rm
    async fn fetch_stock(&self) -> BackendResult<Vec<StockRow>>;

    /// POST /rm/update
    async fn update_stock(&self, adjustment: &StockAdjustment) -> BackendResult<()>;

    /// POST /rm/upload (multipart, 字段名 file)
    async fn upload_stock(&self, file_name: &str, bytes: Vec<u8>) -> BackendResult<()>;

    // ===== 配方 =====

    /// GET /formula
    async fn fetch_formulas(&self) -> BackendResult<Vec<FormulaLine>>;

    /// GET /formula/details/{colorCode}
    async fn fetch_formula_details(&self, color_code: &str) -> BackendResult<Vec<FormulaLine>>;

    /// POST /formula/batch
    async fn save_formula(&self, batch: &FormulaBatch) -> BackendResult<()>;

    /// DELETE /formula/{colorCode}?remarks=
    async fn delete_formula(&self, color_code: &str, remark: &Remark) -> BackendResult<()>;

    // ===== 生产计划 =====

    /// POST /productplan
    async fn submit_plan(&self, submission: &PlanSubmission) -> BackendResult<()>;

    /// GET /planningrecord
    async fn fetch_planning_records(&self) -> BackendResult<Vec<PlanningRecord>>;

    /// PUT /planningrecord/{id}
    async fn update_planning_record_lot(&self, id: &str, lot: f64) -> BackendResult<()>;

    /// DELETE /planningrecord/{id}
    async fn delete_planning_record(&self, id: &str) -> BackendResult<()>;
}
