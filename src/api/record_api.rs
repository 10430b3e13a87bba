// ==========================================
// 配方库存核对系统 - 计划记录 API
// ==========================================
// 职责: 计划记录列表/筛选/统计、修改批数、删除、导出
// 红线: 修改批数与删除记录必须先按配方调整库存
// ==========================================

use std::path::{Path, PathBuf};
use std::sync::Arc;
use serde_json::json;
use tracing::{info, instrument};

use crate::api::audit;
use crate::api::error::{ApiError, ApiResult};
use crate::app::session::SessionContext;
use crate::backend::transport::PlanningBackend;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::formula::FormulaLine;
use crate::domain::inventory::StockAdjustment;
use crate::domain::plan::{PlanningRecord, RecordStats};
use crate::engine::lot_adjustment::{lot_change_adjustments, return_to_stock};
use crate::engine::record_filter::{compute_stats, RecordFilter};
use crate::export::{write_planning_records, write_to_file, ExportError};
use crate::perf::PerfGuard;
use crate::repository::action_log_repo::ActionLogRepository;

/// 修改批数的结果
#[derive(Debug, Clone, PartialEq)]
pub struct LotChange {
    pub record_id: String,
    pub old_lot: f64,
    pub new_lot: f64,
    pub adjustments: Vec<StockAdjustment>,
}

pub struct RecordApi {
    backend: Arc<dyn PlanningBackend>,
    session: Arc<SessionContext>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl RecordApi {
    pub fn new(
        backend: Arc<dyn PlanningBackend>,
        session: Arc<SessionContext>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            backend,
            session,
            action_log_repo,
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub async fn list(&self) -> ApiResult<Vec<PlanningRecord>> {
        Ok(self.backend.fetch_planning_records().await?)
    }

    pub async fn filter(&self, filter: &RecordFilter) -> ApiResult<Vec<PlanningRecord>> {
        let records = self.list().await?;
        Ok(filter.apply(&records).into_iter().cloned().collect())
    }

    pub async fn stats(&self, filter: &RecordFilter) -> ApiResult<RecordStats> {
        let records = self.list().await?;
        Ok(compute_stats(filter.apply(&records)))
    }

    async fn find_record(&self, id: &str) -> ApiResult<PlanningRecord> {
        self.list()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("Record not found: {}", id)))
    }

    /// 记录对应的配方行; 记录带备注且有匹配行时只取该备注
    async fn formula_for(&self, record: &PlanningRecord) -> ApiResult<Vec<FormulaLine>> {
        let lines = self.backend.fetch_formula_details(&record.color_code).await?;
        let Some(remark) = record.remark.as_deref().filter(|r| !r.trim().is_empty()) else {
            return Ok(lines);
        };
        let matching: Vec<FormulaLine> = lines
            .iter()
            .filter(|l| l.remark.as_ref().map_or(false, |r| r.as_str() == remark.trim()))
            .cloned()
            .collect();
        Ok(if matching.is_empty() { lines } else { matching })
    }

    async fn apply_adjustments(&self, adjustments: &[StockAdjustment]) -> ApiResult<()> {
        // 逐条顺序提交, 中途失败不回滚已提交的调整
        for adj in adjustments {
            self.backend.update_stock(adj).await?;
        }
        Ok(())
    }

    // ==========================================
    // 修改 / 删除
    // ==========================================

    /// 批数增加 → 按差值出库; 减少 → 按差值入库; 然后 PUT 新批数
    #[instrument(skip(self))]
    pub async fn edit_lot(&self, id: &str, new_lot: f64) -> ApiResult<LotChange> {
        let _perf = PerfGuard::new("record_edit_lot");
        let session = self.session.require()?;
        if !new_lot.is_finite() || new_lot < 0.0 {
            return Err(ApiError::field("lot", "Lot must be a non-negative number"));
        }

        let record = self.find_record(id).await?;
        let old_lot = if record.lot.is_finite() { record.lot } else { 0.0 };
        let formula = self.formula_for(&record).await?;

        let adjustments = lot_change_adjustments(&formula, old_lot, new_lot);
        self.apply_adjustments(&adjustments).await?;
        self.backend.update_planning_record_lot(id, new_lot).await?;
        info!(old_lot, new_lot, adjustments = adjustments.len(), "计划记录批数已修改");

        audit::record(
            &self.action_log_repo,
            ActionLog::new(ActionType::EditRecordLot, session.actor())
                .with_color_code(&record.color_code)
                .with_payload(json!({ "id": id, "old_lot": old_lot, "new_lot": new_lot })),
        );

        Ok(LotChange {
            record_id: id.to_string(),
            old_lot,
            new_lot,
            adjustments,
        })
    }

    /// 原料按 用量×批数 退回库存后删除记录
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> ApiResult<Vec<StockAdjustment>> {
        let session = self.session.require()?;
        let record = self.find_record(id).await?;
        let lot = if record.lot.is_finite() { record.lot } else { 0.0 };
        let formula = self.formula_for(&record).await?;

        let adjustments = return_to_stock(&formula, lot);
        self.apply_adjustments(&adjustments).await?;
        self.backend.delete_planning_record(id).await?;
        info!(returned = adjustments.len(), "计划记录已删除, 原料已退回");

        audit::record(
            &self.action_log_repo,
            ActionLog::new(ActionType::DeleteRecord, session.actor())
                .with_color_code(&record.color_code)
                .with_payload(json!({ "id": id, "lot": lot })),
        );
        Ok(adjustments)
    }

    // ==========================================
    // 导出
    // ==========================================

    /// 有搜索词时追加 TOTAL 行
    pub async fn export(&self, filter: &RecordFilter, dir: &Path) -> ApiResult<PathBuf> {
        let records = self.list().await?;
        let rows = filter.apply(&records);
        if rows.is_empty() {
            return Err(ExportError::Empty(filter.empty_message_key()).into());
        }

        let now = chrono::Local::now().naive_local();
        let with_total = filter.query().is_some();
        let path = write_to_file(dir, &filter.export_file_name(now), |file| {
            write_planning_records(&rows, with_total, file)
        })?;

        audit::record(
            &self.action_log_repo,
            ActionLog::new(ActionType::ExportRecords, &self.session.actor()).with_payload(json!({
                "path": path.display().to_string(),
                "rows": rows.len(),
            })),
        );
        Ok(path)
    }
}
