// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 临时数据库 + 内存后端装配 AppState
// ==========================================

#![allow(dead_code)]

use std::sync::Arc;
use tempfile::NamedTempFile;

use formula_stock_checker::api::ApiError;
use formula_stock_checker::app::AppState;
use formula_stock_checker::config::{config_keys, ConfigManager};
use formula_stock_checker::domain::{ActionLog, ActionType};

use super::fake_backend::FakeBackend;
use crate::test_helpers::create_test_db;

/// API 测试环境
///
/// 持有临时数据库文件, 生命周期结束时自动删除
pub struct ApiTestEnv {
    pub _temp_file: NamedTempFile,
    pub db_path: String,
    pub backend: Arc<FakeBackend>,
    pub state: AppState,
}

impl ApiTestEnv {
    /// 使用给定后端创建环境; 上传等待时间设为 0
    pub fn with_backend(backend: FakeBackend) -> Result<Self, Box<dyn std::error::Error>> {
        let (temp_file, db_path) = create_test_db()?;

        // AppState 启动时读取配置, 需在装配前写入
        let config = ConfigManager::new(&db_path)?;
        config.set(config_keys::UPLOAD_SETTLE_MS, "0")?;
        drop(config);

        let backend = Arc::new(backend);
        let state = AppState::with_backend(db_path.clone(), backend.clone())?;

        Ok(Self {
            _temp_file: temp_file,
            db_path,
            backend,
            state,
        })
    }

    /// 默认数据: 两个用户 + 样例配方/库存/记录
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        use crate::test_helpers::{sample_formulas, sample_records, sample_stock};
        let backend = super::fake_backend::default_users(FakeBackend::new())
            .with_formulas(sample_formulas())
            .with_stock(sample_stock())
            .with_records(sample_records());
        Self::with_backend(backend)
    }

    pub async fn login_worker(&self) {
        self.state
            .user_api
            .login("worker1", "Worker@123")
            .await
            .expect("普通用户登录失败");
    }

    pub async fn login_admin(&self) {
        self.state
            .user_api
            .admin_login("admin1", "Admin@123")
            .await
            .expect("管理员登录失败");
    }

    /// 指定类型的审计日志
    pub fn logs_of(&self, action_type: ActionType) -> Vec<ActionLog> {
        self.state
            .action_log_repo
            .find_by_action_type(action_type)
            .expect("查询操作日志失败")
    }
}

/// 断言为字段校验错误并包含指定字段
pub fn assert_field_error(err: &ApiError, field: &str) {
    match err {
        ApiError::ValidationError { violations, .. } => {
            assert!(
                violations.iter().any(|v| v.field == field),
                "缺少字段 {} 的校验错误: {:?}",
                field,
                violations
            );
        }
        other => panic!("期望 ValidationError, 实际: {:?}", other),
    }
}
