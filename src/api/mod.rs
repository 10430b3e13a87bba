// ==========================================
// 配方库存核对系统 - API 层
// ==========================================
// 职责: 各页面的业务接口, 供 CLI 调用
// 依赖: SessionContext（令牌）、PlanningBackend（远端）、
//       ActionLogRepository（本地审计）
// ==========================================

mod audit;
pub mod config_api;
pub mod error;
pub mod formula_api;
pub mod plan_api;
pub mod record_api;
pub mod stock_api;
pub mod user_api;
pub mod validator;

// 重导出核心类型
pub use config_api::ConfigApi;
pub use error::{ApiError, ApiResult, ErrorResponse, FieldViolation};
pub use formula_api::FormulaApi;
pub use plan_api::{PlanApi, PlanData};
pub use record_api::{LotChange, RecordApi};
pub use stock_api::{StockApi, UploadOutcome};
pub use user_api::UserApi;
pub use validator::{EditUserForm, RegisterForm, ResetPasswordForm};
