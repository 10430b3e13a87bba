// ==========================================
// 配方库存核对系统 - 应用层
// ==========================================
// 职责: 会话上下文、请求序号、应用装配
// ==========================================

pub mod sequencer;
pub mod session;
pub mod state;

// 重导出
pub use sequencer::{Latest, RequestTicket};
pub use session::{SessionContext, SessionStore};
pub use state::{get_default_db_path, AppState};
