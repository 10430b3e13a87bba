// ==========================================
// 配方库存核对系统 - 原料库存 API
// ==========================================
// 职责: 库存列表/检索、手工入出库、上传库存文件、库存告警与导出
// ==========================================

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use serde_json::json;
use tracing::{info, instrument};

use crate::api::audit;
use crate::api::error::{ApiError, ApiResult};
use crate::app::session::SessionContext;
use crate::backend::transport::PlanningBackend;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::inventory::{StockAdjustment, StockRow};
use crate::domain::plan::AdjustmentInput;
use crate::engine::stock_alert::{AlertReport, AlertThresholds, StockAlertEngine};
use crate::export::{write_alert_report, write_to_file, ExportError};
use crate::importer::error::ImportError;
use crate::importer::file_parser::supported_extension;
use crate::importer::stock_sheet::{validate_stock_file, StockSheetSummary};
use crate::perf::PerfGuard;
use crate::repository::action_log_repo::ActionLogRepository;

/// 上传结果: 本地校验摘要 + 上传后刷新的库存
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub summary: StockSheetSummary,
    pub stock: Vec<StockRow>,
}

pub struct StockApi {
    backend: Arc<dyn PlanningBackend>,
    session: Arc<SessionContext>,
    action_log_repo: Arc<ActionLogRepository>,
    alert_engine: StockAlertEngine,
    upload_settle: Duration,
}

impl StockApi {
    pub fn new(
        backend: Arc<dyn PlanningBackend>,
        session: Arc<SessionContext>,
        action_log_repo: Arc<ActionLogRepository>,
        thresholds: AlertThresholds,
        upload_settle: Duration,
    ) -> Self {
        Self {
            backend,
            session,
            action_log_repo,
            alert_engine: StockAlertEngine::new(thresholds),
            upload_settle,
        }
    }

    /// GET /rm, 按代码模糊检索
    pub async fn list(&self, search: Option<&str>) -> ApiResult<Vec<StockRow>> {
        let rows = self.backend.fetch_stock().await?;
        Ok(match search {
            Some(q) => rows.into_iter().filter(|r| r.matches_search(q)).collect(),
            None => rows,
        })
    }

    /// 手工入/出库; 数量按 parse-or-zero 解析
    #[instrument(skip(self))]
    pub async fn update(&self, code: &str, in_input: &str, out_input: &str) -> ApiResult<StockAdjustment> {
        let session = self.session.require()?;
        let code = code.trim();
        if code.is_empty() {
            return Err(ApiError::field("code", "Chemical code is required"));
        }
        let input = AdjustmentInput::from_inputs(in_input, out_input);
        let adjustment = StockAdjustment {
            code: code.to_string(),
            in_amount: input.in_amount,
            out_amount: input.out_amount,
        };

        self.backend.update_stock(&adjustment).await?;
        info!(code, in_amount = adjustment.in_amount, out_amount = adjustment.out_amount, "库存已更新");

        audit::record(
            &self.action_log_repo,
            ActionLog::new(ActionType::UpdateStock, session.actor())
                .with_payload(serde_json::to_value(&adjustment).unwrap_or_default()),
        );
        Ok(adjustment)
    }

    /// 上传库存文件
    ///
    /// 1. 扩展名检查（.xlsx/.xls/.csv/.json）
    /// 2. 本地解析校验
    /// 3. POST /rm/upload
    /// 4. 等待服务器落库后刷新库存
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn upload(&self, path: &Path) -> ApiResult<UploadOutcome> {
        let _perf = PerfGuard::new("stock_upload");
        let session = self.session.require()?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ApiError::InvalidInput(format!("无效的文件路径: {}", path.display())))?;
        supported_extension(&file_name)?;
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()).into());
        }

        let summary = validate_stock_file(path)?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(ImportError::from)?;

        self.backend.upload_stock(&file_name, bytes).await?;
        audit::record(
            &self.action_log_repo,
            ActionLog::new(ActionType::UploadStock, session.actor()).with_payload(json!({
                "file_name": summary.file_name,
                "rows": summary.row_count,
                "codes": summary.distinct_codes,
            })),
        );

        if !self.upload_settle.is_zero() {
            tokio::time::sleep(self.upload_settle).await;
        }
        let stock = self.backend.fetch_stock().await?;
        info!(rows = stock.len(), "上传后库存已刷新");

        Ok(UploadOutcome { summary, stock })
    }

    // ==========================================
    // 库存告警
    // ==========================================

    pub async fn alerts(&self, search: Option<&str>) -> ApiResult<AlertReport> {
        let rows = self.backend.fetch_stock().await?;
        let now = chrono::Local::now().naive_local();
        Ok(self.alert_engine.build_report(&rows, search, now))
    }

    /// 导出告警报表 CSV, 返回文件路径
    pub async fn export_alerts(&self, search: Option<&str>, dir: &Path) -> ApiResult<PathBuf> {
        let report = self.alerts(search).await?;
        if report.is_empty() {
            return Err(ExportError::Empty("export.no_alerts").into());
        }
        let path = write_to_file(dir, &report.file_name(), |file| {
            write_alert_report(&report, file)
        })?;

        audit::record(
            &self.action_log_repo,
            ActionLog::new(ActionType::ExportAlert, &self.session.actor()).with_payload(json!({
                "path": path.display().to_string(),
                "items": report.items.len(),
            })),
        );
        Ok(path)
    }
}
