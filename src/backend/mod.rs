// ==========================================
// 配方库存核对系统 - 后端通信层
// ==========================================
// 职责: 与规划后端 REST 服务交互, 响应归一化为领域类型
// ==========================================

pub mod error;
pub mod http;
pub mod transport;
pub mod wire;

pub use error::{extract_error_message, BackendError, BackendResult};
pub use http::HttpBackend;
pub use transport::{LoginOutcome, PlanningBackend};
