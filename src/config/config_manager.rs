// ==========================================
// 配方库存核对系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value, scope_id='global')
// 约定: 键缺失或值格式错误时回退到内置默认值
// ==========================================

use crate::db::open_sqlite_connection;
use crate::engine::stock_alert::AlertThresholds;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

/// 配置项（list_all 输出）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub is_default: bool,
}

impl ConfigManager {
    /// 打开独立连接
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        crate::db::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（与其他仓储共享连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的原始配置值
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_config_or_default(&self, key: &str) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| config_keys::default_for(key).unwrap_or_default().to_string()))
    }

    fn get_f64(&self, key: &str) -> RepositoryResult<f64> {
        let fallback = config_keys::default_for(key)
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);
        let value = self.get_config_or_default(key)?;
        Ok(match value.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => v,
            _ => {
                tracing::warn!(config_key = key, raw_value = %value, "配置值格式错误，使用默认值");
                fallback
            }
        })
    }

    fn get_u64(&self, key: &str) -> RepositoryResult<u64> {
        let fallback = config_keys::default_for(key)
            .and_then(|d| d.parse::<u64>().ok())
            .unwrap_or(0);
        let value = self.get_config_or_default(key)?;
        Ok(value.trim().parse::<u64>().unwrap_or_else(|_| {
            tracing::warn!(config_key = key, raw_value = %value, "配置值格式错误，使用默认值");
            fallback
        }))
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 写入配置; 已知数值键会先校验格式
    pub fn set(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(RepositoryError::FieldValueError {
                field: "key".to_string(),
                message: "配置键不能为空".to_string(),
            });
        }
        config_keys::validate(key, value)?;

        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value.trim()],
        )?;
        tracing::info!(config_key = key, "配置已更新");
        Ok(())
    }

    /// 删除覆写, 恢复默认值
    pub fn unset(&self, key: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let n = conn.execute(
            "DELETE FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
        )?;
        Ok(n > 0)
    }

    /// 全部配置: 已知键（含默认值）+ 存储中的其他键
    pub fn list_all(&self) -> RepositoryResult<Vec<ConfigEntry>> {
        let stored = self.stored_values()?;
        let mut entries: Vec<ConfigEntry> = config_keys::KNOWN
            .iter()
            .map(|(key, default)| match stored.get(*key) {
                Some(v) => ConfigEntry {
                    key: key.to_string(),
                    value: v.clone(),
                    is_default: false,
                },
                None => ConfigEntry {
                    key: key.to_string(),
                    value: default.to_string(),
                    is_default: true,
                },
            })
            .collect();

        for (key, value) in stored.iter() {
            if config_keys::default_for(key).is_none() {
                entries.push(ConfigEntry {
                    key: key.clone(),
                    value: value.clone(),
                    is_default: false,
                });
            }
        }
        Ok(entries)
    }

    fn stored_values(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut map = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            map.insert(key, value);
        }
        Ok(map)
    }

    /// 配置快照（JSON）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let map = self.stored_values()?;
        Ok(serde_json::to_string(&map)?)
    }

    /// 从快照恢复（覆盖同名键）, 返回写入条数
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> RepositoryResult<usize> {
        let map: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;
        for (key, value) in map.iter() {
            config_keys::validate(key, value)?;
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let mut count = 0;
        for (key, value) in map.iter() {
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(count)
    }

    // ==========================================
    // 类型化读取
    // ==========================================

    pub fn api_base_url(&self) -> RepositoryResult<String> {
        let value = self.get_config_or_default(config_keys::API_BASE_URL)?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(config_keys::DEFAULT_API_BASE_URL.to_string());
        }
        Ok(trimmed.to_string())
    }

    pub fn api_timeout_ms(&self) -> RepositoryResult<u64> {
        self.get_u64(config_keys::API_TIMEOUT_MS)
    }

    pub fn upload_settle_ms(&self) -> RepositoryResult<u64> {
        self.get_u64(config_keys::UPLOAD_SETTLE_MS)
    }

    pub fn low_remaining_after_use_kg(&self) -> RepositoryResult<f64> {
        self.get_f64(config_keys::LOW_REMAINING_AFTER_USE_KG)
    }

    pub fn locale(&self) -> RepositoryResult<String> {
        self.get_config_or_default(config_keys::LOCALE)
    }

    /// 库存告警阈值; very_low >= low 时视为配置错误, 回退默认
    pub fn alert_thresholds(&self) -> RepositoryResult<AlertThresholds> {
        let very_low_kg = self.get_f64(config_keys::VERY_LOW_STOCK_THRESHOLD_KG)?;
        let low_kg = self.get_f64(config_keys::LOW_STOCK_THRESHOLD_KG)?;
        if very_low_kg >= low_kg {
            tracing::warn!(very_low_kg, low_kg, "告警阈值顺序错误，使用默认值");
            return Ok(AlertThresholds::default());
        }
        Ok(AlertThresholds {
            very_low_kg,
            low_kg,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    use crate::repository::error::{RepositoryError, RepositoryResult};

    pub const API_BASE_URL: &str = "api_base_url";
    pub const API_TIMEOUT_MS: &str = "api_timeout_ms";
    pub const LOW_STOCK_THRESHOLD_KG: &str = "low_stock_threshold_kg";
    pub const VERY_LOW_STOCK_THRESHOLD_KG: &str = "very_low_stock_threshold_kg";
    pub const LOW_REMAINING_AFTER_USE_KG: &str = "low_remaining_after_use_kg";
    pub const LOCALE: &str = "locale";
    pub const UPLOAD_SETTLE_MS: &str = "upload_settle_ms";

    pub const DEFAULT_API_BASE_URL: &str = "http://192.168.10.180:4000/api";

    /// 已知键及默认值
    pub const KNOWN: [(&str, &str); 7] = [
        (API_BASE_URL, DEFAULT_API_BASE_URL),
        (API_TIMEOUT_MS, "10000"),
        (LOW_STOCK_THRESHOLD_KG, "1000"),
        (VERY_LOW_STOCK_THRESHOLD_KG, "500"),
        (LOW_REMAINING_AFTER_USE_KG, "1000"),
        (LOCALE, "en"),
        (UPLOAD_SETTLE_MS, "500"),
    ];

    pub fn default_for(key: &str) -> Option<&'static str> {
        KNOWN.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    /// 已知键的格式校验; 未知键不校验
    pub fn validate(key: &str, value: &str) -> RepositoryResult<()> {
        let value = value.trim();
        let bad = |message: &str| RepositoryError::FieldValueError {
            field: key.to_string(),
            message: message.to_string(),
        };
        match key {
            API_TIMEOUT_MS | UPLOAD_SETTLE_MS => {
                value.parse::<u64>().map_err(|_| bad("需要非负整数（毫秒）"))?;
            }
            LOW_STOCK_THRESHOLD_KG | VERY_LOW_STOCK_THRESHOLD_KG | LOW_REMAINING_AFTER_USE_KG => {
                match value.parse::<f64>() {
                    Ok(v) if v.is_finite() && v >= 0.0 => {}
                    _ => return Err(bad("需要非负数值（kg）")),
                }
            }
            API_BASE_URL => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(bad("需要 http:// 或 https:// 开头的地址"));
                }
            }
            LOCALE => {
                if !matches!(value, "en" | "th") {
                    return Err(bad("支持的语言: en, th"));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_defaults_when_unset() {
        let cfg = manager();
        assert_eq!(cfg.api_base_url().unwrap(), config_keys::DEFAULT_API_BASE_URL);
        assert_eq!(cfg.api_timeout_ms().unwrap(), 10_000);
        assert_eq!(cfg.upload_settle_ms().unwrap(), 500);
        assert_eq!(cfg.low_remaining_after_use_kg().unwrap(), 1000.0);
        assert_eq!(cfg.alert_thresholds().unwrap(), AlertThresholds::default());
        assert!(cfg.list_all().unwrap().iter().all(|e| e.is_default));
    }

    #[test]
    fn test_set_validates_known_keys() {
        let cfg = manager();
        assert!(cfg.set(config_keys::API_TIMEOUT_MS, "abc").is_err());
        assert!(cfg.set(config_keys::LOCALE, "fr").is_err());
        assert!(cfg.set(config_keys::API_BASE_URL, "ftp://x").is_err());

        cfg.set(config_keys::API_TIMEOUT_MS, "2500").unwrap();
        assert_eq!(cfg.api_timeout_ms().unwrap(), 2500);

        assert!(cfg.unset(config_keys::API_TIMEOUT_MS).unwrap());
        assert_eq!(cfg.api_timeout_ms().unwrap(), 10_000);
    }

    #[test]
    fn test_malformed_stored_value_falls_back() {
        let cfg = manager();
        {
            let conn = cfg.get_conn().unwrap();
            conn.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', 'low_stock_threshold_kg', 'lots')",
                [],
            )
            .unwrap();
        }
        assert_eq!(cfg.alert_thresholds().unwrap().low_kg, 1000.0);
    }

    #[test]
    fn test_inverted_thresholds_use_defaults() {
        let cfg = manager();
        cfg.set(config_keys::VERY_LOW_STOCK_THRESHOLD_KG, "800").unwrap();
        cfg.set(config_keys::LOW_STOCK_THRESHOLD_KG, "600").unwrap();
        assert_eq!(cfg.alert_thresholds().unwrap(), AlertThresholds::default());

        cfg.set(config_keys::LOW_STOCK_THRESHOLD_KG, "2000").unwrap();
        let t = cfg.alert_thresholds().unwrap();
        assert_eq!((t.very_low_kg, t.low_kg), (800.0, 2000.0));
    }

    #[test]
    fn test_snapshot_restore() {
        let cfg = manager();
        cfg.set(config_keys::LOCALE, "th").unwrap();
        cfg.set("custom_note", "hello").unwrap();
        let snapshot = cfg.get_config_snapshot().unwrap();

        let other = manager();
        assert_eq!(other.restore_config_from_snapshot(&snapshot).unwrap(), 2);
        assert_eq!(other.locale().unwrap(), "th");
        let entries = other.list_all().unwrap();
        assert!(entries.iter().any(|e| e.key == "custom_note" && !e.is_default));
    }
}
