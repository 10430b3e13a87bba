// ==========================================
// 配方库存核对系统 - 配置层
// ==========================================
// 职责: 本地配置管理, 环境变量覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod settings;

pub use config_manager::{config_keys, ConfigEntry, ConfigManager};
pub use settings::ClientSettings;
