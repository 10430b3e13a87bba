// ==========================================
// 配方库存核对系统 - 配置管理 API
// ==========================================
// 职责: 配置查询、更新、快照管理
// 生效: 修改后下次启动（或重新构造 AppState）时生效
// ==========================================

use std::sync::Arc;
use serde_json::json;

use crate::api::audit;
use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::{config_keys, ConfigEntry, ConfigManager};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::repository::action_log_repo::ActionLogRepository;

// ==========================================
// ConfigApi - 配置管理 API
// ==========================================

/// 配置管理API
///
/// 职责：
/// 1. 配置查询（全部、单个）
/// 2. 配置更新 / 恢复默认
/// 3. 配置快照
/// 4. ActionLog记录
pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl ConfigApi {
    pub fn new(config_manager: Arc<ConfigManager>, action_log_repo: Arc<ActionLogRepository>) -> Self {
        Self {
            config_manager,
            action_log_repo,
        }
    }

    /// 全部已知配置项（未设置的显示默认值）
    pub fn list_configs(&self) -> ApiResult<Vec<ConfigEntry>> {
        Ok(self.config_manager.list_all()?)
    }

    /// 查询单个配置; 未知键报错
    pub fn get_config(&self, key: &str) -> ApiResult<ConfigEntry> {
        let default = config_keys::default_for(key)
            .ok_or_else(|| ApiError::InvalidInput(format!("未知配置项: {}", key)))?;
        let stored = self.config_manager.get_global_config_value(key)?;
        Ok(ConfigEntry {
            key: key.to_string(),
            is_default: stored.is_none(),
            value: stored.unwrap_or_else(|| default.to_string()),
        })
    }

    /// 更新配置（带校验）
    pub fn update_config(&self, key: &str, value: &str, operator: &str) -> ApiResult<()> {
        if config_keys::default_for(key).is_none() {
            return Err(ApiError::InvalidInput(format!("未知配置项: {}", key)));
        }
        let old = self.config_manager.get_global_config_value(key)?;
        self.config_manager.set(key, value)?;

        audit::record(
            &self.action_log_repo,
            ActionLog::new(ActionType::UpdateConfig, operator).with_payload(json!({
                "key": key,
                "old_value": old,
                "new_value": value,
            })),
        );
        Ok(())
    }

    /// 删除已存值, 恢复默认; 返回是否有值被删除
    pub fn reset_config(&self, key: &str, operator: &str) -> ApiResult<bool> {
        let removed = self.config_manager.unset(key)?;
        if removed {
            audit::record(
                &self.action_log_repo,
                ActionLog::new(ActionType::UpdateConfig, operator)
                    .with_payload(json!({ "key": key, "reset": true })),
            );
        }
        Ok(removed)
    }

    pub fn get_config_snapshot(&self) -> ApiResult<String> {
        Ok(self.config_manager.get_config_snapshot()?)
    }

    pub fn restore_from_snapshot(&self, snapshot_json: &str, operator: &str) -> ApiResult<usize> {
        if snapshot_json.trim().is_empty() {
            return Err(ApiError::InvalidInput("快照内容不能为空".to_string()));
        }
        let restored = self
            .config_manager
            .restore_config_from_snapshot(snapshot_json)?;

        audit::record(
            &self.action_log_repo,
            ActionLog::new(ActionType::UpdateConfig, operator)
                .with_payload(json!({ "restored": restored })),
        );
        Ok(restored)
    }
}
