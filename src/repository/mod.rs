// ==========================================
// 配方库存核对系统 - 本地数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化
// ==========================================
// 业务数据（库存/配方/计划）全部在远端服务; 本地只保存
// 操作日志与登录会话; 配置见 config::ConfigManager
// ==========================================

pub mod action_log_repo;
pub mod error;
pub mod session_repo;

pub use action_log_repo::ActionLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use session_repo::SessionRepository;
