// ==========================================
// 配方库存核对系统 - 配方 API
// ==========================================
// 职责: 配方列表/检索、新建配方、保存编辑、删除整个配方
// 本地编辑: FormulaDraft（新建）/ FormulaEditor（已有配方）
// ==========================================

use std::sync::Arc;
use serde_json::json;
use tracing::{info, instrument};

use crate::api::audit;
use crate::api::error::{ApiError, ApiResult};
use crate::app::session::SessionContext;
use crate::backend::transport::PlanningBackend;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::formula::{DraftError, FormulaBatch, FormulaDraft, FormulaEditor, FormulaLine};
use crate::domain::types::Remark;
use crate::repository::action_log_repo::ActionLogRepository;

impl From<DraftError> for ApiError {
    fn from(err: DraftError) -> Self {
        match err {
            DraftError::RemarkRequired => ApiError::field("remark", err.to_string()),
            DraftError::HeaderIncomplete => ApiError::field("colorCode", err.to_string()),
            DraftError::NoChemicals | DraftError::LineIncomplete => {
                ApiError::field("chemicals", err.to_string())
            }
            DraftError::LineOutOfRange(_) => ApiError::InvalidInput(err.to_string()),
        }
    }
}

pub struct FormulaApi {
    backend: Arc<dyn PlanningBackend>,
    session: Arc<SessionContext>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl FormulaApi {
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

    pub async fn list(&self) -> ApiResult<Vec<FormulaLine>> {
        Ok(self.backend.fetch_formulas().await?)
    }

    /// 产品代码大小写不敏感精确匹配 + 备注
    pub async fn filter(&self, color_code: &str, remark: Option<&Remark>) -> ApiResult<Vec<FormulaLine>> {
        if color_code.trim().is_empty() {
            return Err(ApiError::field("colorCode", "Product code is required"));
        }
        let lines = self.backend.fetch_formulas().await?;
        Ok(lines
            .into_iter()
            .filter(|l| l.matches_formula_search(color_code, remark))
            .collect())
    }

    /// GET /formula/details/{colorCode}
    pub async fn details(&self, color_code: &str) -> ApiResult<Vec<FormulaLine>> {
        if color_code.trim().is_empty() {
            return Err(ApiError::field("colorCode", "Product code is required"));
        }
        Ok(self.backend.fetch_formula_details(color_code.trim()).await?)
    }

    /// 以检索结果构造编辑器
    pub async fn editor(&self, color_code: &str, remark: Option<Remark>) -> ApiResult<FormulaEditor> {
        let lines = self.filter(color_code, remark.as_ref()).await?;
        Ok(FormulaEditor::new(color_code, remark, lines))
    }

    // ==========================================
    // 写操作
    // ==========================================

    /// 新建配方（POST /formula/batch）
    #[instrument(skip(self, draft), fields(color_code = %draft.color_code))]
    pub async fn create(&self, draft: &FormulaDraft) -> ApiResult<FormulaBatch> {
        let session = self.session.require()?;
        let batch = draft.to_batch()?;
        self.save_batch(&batch, session.actor()).await?;
        Ok(batch)
    }

    /// 保存已有配方的编辑结果
    #[instrument(skip(self, editor), fields(color_code = %editor.color_code))]
    pub async fn save_edits(&self, editor: &FormulaEditor) -> ApiResult<FormulaBatch> {
        let session = self.session.require()?;
        let batch = editor.to_batch()?;
        self.save_batch(&batch, session.actor()).await?;
        Ok(batch)
    }

    async fn save_batch(&self, batch: &FormulaBatch, actor: &str) -> ApiResult<()> {
        self.backend.save_formula(batch).await?;
        info!(chemicals = batch.chemicals.len(), remarks = %batch.remarks, "配方已保存");
        audit::record(
            &self.action_log_repo,
            ActionLog::new(ActionType::SaveFormula, actor)
                .with_color_code(&batch.color_code)
                .with_payload(serde_json::to_value(batch).unwrap_or_default()),
        );
        Ok(())
    }

    /// 删除某产品代码在一个备注下的全部配方行
    #[instrument(skip(self))]
    pub async fn delete_formula(&self, color_code: &str, remark: Option<&Remark>) -> ApiResult<()> {
        let session = self.session.require()?;
        let code = color_code.trim();
        if code.is_empty() {
            return Err(ApiError::field("colorCode", "Product code is required"));
        }
        let remark = remark.ok_or_else(|| ApiError::field("remark", DraftError::RemarkRequired.to_string()))?;

        self.backend.delete_formula(code, remark).await?;
        info!(code, remark = %remark, "配方已删除");
        audit::record(
            &self.action_log_repo,
            ActionLog::new(ActionType::DeleteFormula, session.actor())
                .with_color_code(code)
                .with_payload(json!({ "remarks": remark.as_str() })),
        );
        Ok(())
    }
}
