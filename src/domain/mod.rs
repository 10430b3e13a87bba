// ==========================================
// 配方库存核对系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、输入解析规则
// 红线: 不含数据访问逻辑，不含引擎逻辑，不含网络调用
// ==========================================

pub mod action_log;
pub mod formula;
pub mod inventory;
pub mod numeric;
pub mod plan;
pub mod types;
pub mod user;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use formula::{
    DraftError, DraftLine, FormulaBatch, FormulaChemical, FormulaDraft, FormulaEditor, FormulaLine,
};
pub use inventory::{Inventory, InventoryRecord, StockAdjustment, StockRow};
pub use plan::{
    AdjustmentBook, AdjustmentInput, PlanForm, PlanSubmission, PlanUpdateLine, PlanningRecord,
    ProductionRequest, RecordStats,
};
pub use types::{Department, IngredientNotice, Remark, StockAlertLevel, UserRole};
pub use user::{Credentials, NewUser, PasswordReset, Session, User, UserUpdate};
