// ==========================================
// 配方库存核对系统 - 应用状态
// ==========================================
// 职责: 进程启动时一次性装配本地数据库、配置、会话与各 API
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{ConfigApi, FormulaApi, PlanApi, RecordApi, StockApi, UserApi};
use crate::app::session::SessionContext;
use crate::backend::http::HttpBackend;
use crate::backend::transport::PlanningBackend;
use crate::config::config_manager::ConfigManager;
use crate::config::settings::ClientSettings;
use crate::repository::{ActionLogRepository, SessionRepository};

pub const ENV_DB_PATH: &str = "FSC_DB_PATH";

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 启动时解析的运行参数
    pub settings: ClientSettings,

    /// 当前登录会话
    pub session: Arc<SessionContext>,

    pub plan_api: Arc<PlanApi>,
    pub stock_api: Arc<StockApi>,
    pub formula_api: Arc<FormulaApi>,
    pub record_api: Arc<RecordApi>,
    pub user_api: Arc<UserApi>,
    pub config_api: Arc<ConfigApi>,

    /// 操作日志仓储（用于审计查询）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 使用 HTTP 后端创建 AppState
    ///
    /// # 说明
    /// 1. 打开并初始化本地数据库
    /// 2. 读取配置（环境变量优先）并切换界面语言
    /// 3. 按配置构造 HTTP 客户端
    /// 4. 恢复上次保存的会话
    pub fn new(db_path: String) -> Result<Self, String> {
        let (conn, config_manager, settings) = Self::open_local(&db_path)?;
        let backend = HttpBackend::from_settings(&settings)
            .map_err(|e| format!("无法创建HTTP客户端: {}", e))?;
        Ok(Self::assemble(
            db_path,
            conn,
            config_manager,
            settings,
            Arc::new(backend),
        ))
    }

    /// 注入自定义后端（测试使用内存实现）
    pub fn with_backend(db_path: String, backend: Arc<dyn PlanningBackend>) -> Result<Self, String> {
        let (conn, config_manager, settings) = Self::open_local(&db_path)?;
        Ok(Self::assemble(db_path, conn, config_manager, settings, backend))
    }

    fn open_local(
        db_path: &str,
    ) -> Result<(Arc<Mutex<rusqlite::Connection>>, Arc<ConfigManager>, ClientSettings), String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = crate::db::open_and_init(db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(ConfigManager::from_connection(conn.clone()));
        let settings = ClientSettings::from_config(&config_manager)
            .map_err(|e| format!("无法读取配置: {}", e))?;

        if !crate::i18n::set_locale(&settings.locale) {
            tracing::warn!(locale = %settings.locale, "不支持的语言, 保持默认");
        }
        Ok((conn, config_manager, settings))
    }

    fn assemble(
        db_path: String,
        conn: Arc<Mutex<rusqlite::Connection>>,
        config_manager: Arc<ConfigManager>,
        settings: ClientSettings,
        backend: Arc<dyn PlanningBackend>,
    ) -> Self {
        // ==========================================
        // 初始化Repository层
        // ==========================================
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));
        let session_repo = Arc::new(SessionRepository::new(conn));

        // ==========================================
        // 会话
        // ==========================================
        let session = Arc::new(SessionContext::with_store(backend.clone(), session_repo));
        match session.restore() {
            Ok(Some(s)) => tracing::info!(user = %s.user.username, "已恢复登录会话"),
            Ok(None) => {}
            Err(e) => tracing::warn!("会话恢复失败(将以未登录状态继续): {}", e),
        }

        // ==========================================
        // 创建API实例
        // ==========================================
        let plan_api = Arc::new(PlanApi::new(
            backend.clone(),
            session.clone(),
            action_log_repo.clone(),
            settings.low_remaining_after_use_kg,
        ));
        let stock_api = Arc::new(StockApi::new(
            backend.clone(),
            session.clone(),
            action_log_repo.clone(),
            settings.alert_thresholds,
            settings.upload_settle,
        ));
        let formula_api = Arc::new(FormulaApi::new(
            backend.clone(),
            session.clone(),
            action_log_repo.clone(),
        ));
        let record_api = Arc::new(RecordApi::new(
            backend.clone(),
            session.clone(),
            action_log_repo.clone(),
        ));
        let user_api = Arc::new(UserApi::new(backend, session.clone(), action_log_repo.clone()));
        let config_api = Arc::new(ConfigApi::new(config_manager, action_log_repo.clone()));

        tracing::info!(base_url = %settings.base_url, "AppState初始化完成");

        Self {
            db_path,
            settings,
            session,
            plan_api,
            stock_api,
            formula_api,
            record_api,
            user_api,
            config_api,
            action_log_repo,
        }
    }
}

/// 获取默认数据库路径
///
/// 优先环境变量 FSC_DB_PATH, 其次用户数据目录, 最后当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(ENV_DB_PATH) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./formula_stock_checker.db");

    if let Some(data_dir) = dirs::data_local_dir() {
        let dir = data_dir.join("formula-stock-checker");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("formula_stock_checker.db");
        }
    }

    path.to_string_lossy().to_string()
}
