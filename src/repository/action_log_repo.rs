// ==========================================
// 配方库存核对系统 - 操作日志数据仓储
// ==========================================
// 对齐: db.rs action_log 表
// 红线: 经由本客户端发起的写操作必须记录
// ==========================================

mod core;
mod queries;


pub use core::ActionLogRepository;
