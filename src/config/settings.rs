// ==========================================
// 配方库存核对系统 - 客户端运行参数
// ==========================================
// 优先级: 环境变量 > config_kv > 内置默认值
// - FSC_API_BASE_URL: 后端地址
// - FSC_API_TIMEOUT_MS: 请求超时（毫秒）
// ==========================================

use crate::config::config_manager::{config_keys, ConfigManager};
use crate::engine::stock_alert::AlertThresholds;
use crate::repository::error::RepositoryResult;
use std::time::Duration;

pub const ENV_API_BASE_URL: &str = "FSC_API_BASE_URL";
pub const ENV_API_TIMEOUT_MS: &str = "FSC_API_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub upload_settle: Duration,
    pub low_remaining_after_use_kg: f64,
    pub alert_thresholds: AlertThresholds,
    pub locale: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: config_keys::DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_millis(10_000),
            upload_settle: Duration::from_millis(500),
            low_remaining_after_use_kg: 1000.0,
            alert_thresholds: AlertThresholds::default(),
            locale: "en".to_string(),
        }
    }
}

impl ClientSettings {
    /// 从 config_kv 读取, 再应用进程环境变量覆写
    pub fn from_config(config: &ConfigManager) -> RepositoryResult<Self> {
        Self::from_config_with_env(config, |name| std::env::var(name).ok())
    }

    /// env 参数便于测试注入
    pub fn from_config_with_env<F>(config: &ConfigManager, env: F) -> RepositoryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self {
            base_url: config.api_base_url()?,
            timeout: Duration::from_millis(config.api_timeout_ms()?),
            upload_settle: Duration::from_millis(config.upload_settle_ms()?),
            low_remaining_after_use_kg: config.low_remaining_after_use_kg()?,
            alert_thresholds: config.alert_thresholds()?,
            locale: config.locale()?,
        };
        settings.apply_env(env);
        Ok(settings)
    }

    fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = env(ENV_API_BASE_URL) {
            let url = url.trim();
            if !url.is_empty() {
                self.base_url = url.to_string();
            }
        }
        if let Some(raw) = env(ENV_API_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.timeout = Duration::from_millis(ms),
                Err(_) => tracing::warn!(env = ENV_API_TIMEOUT_MS, raw = %raw, "超时环境变量无效，忽略"),
            }
        }
    }
}
