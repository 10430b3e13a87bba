// ==========================================
// 配方库存核对系统 - 核心库
// ==========================================
// 技术栈: Rust + reqwest + SQLite
// 系统定位: 生产计划前的原料库存核对（远端服务为数据源）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 纯计算规则
pub mod engine;

// 后端通信层 - REST 接口与归一化
pub mod backend;

// 数据仓储层 - 本地审计与会话
pub mod repository;

// 导入层 - 上传前的本地文件校验
pub mod importer;

// 导出层 - CSV 报表
pub mod export;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// 性能统计
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - 会话与装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{
    ActionLog, ActionType, Department, FormulaLine, Inventory, InventoryRecord, PlanForm,
    PlanningRecord, ProductionRequest, Remark, StockRow,
};

// 引擎
pub use engine::{PlanCheck, PlanChecker, StockAlertEngine, StockProjector};

// 后端
pub use backend::{BackendError, HttpBackend, PlanningBackend};

// API
pub use api::{ApiError, ApiResult, FormulaApi, PlanApi, RecordApi, StockApi, UserApi};

// 应用
pub use app::{AppState, SessionContext};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "配方库存核对系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
