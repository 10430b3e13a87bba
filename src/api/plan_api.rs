// ==========================================
// 配方库存核对系统 - 生产计划 API
// ==========================================
// 职责: 加载配方与库存、按产品代码检索、核对、提交计划
// 红线: 任一原料不足时禁止提交
// 并发: 配方与库存并发拉取, 过期响应按序号丢弃
// ==========================================

use std::sync::Arc;
use tracing::{info, instrument};

use crate::api::audit;
use crate::api::error::{ApiError, ApiResult, FieldViolation};
use crate::app::sequencer::Latest;
use crate::app::session::SessionContext;
use crate::backend::transport::PlanningBackend;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::formula::FormulaLine;
use crate::domain::inventory::{Inventory, StockRow};
use crate::domain::plan::{AdjustmentBook, PlanForm, PlanSubmission, PlanUpdateLine};
use crate::domain::types::Remark;
use crate::engine::plan_checker::{PlanCheck, PlanChecker};
use crate::perf::PerfGuard;
use crate::repository::action_log_repo::ActionLogRepository;

/// 计划页所需的全部数据
#[derive(Debug, Clone, Default)]
pub struct PlanData {
    pub formulas: Vec<FormulaLine>,
    pub stock: Vec<StockRow>,
}

pub struct PlanApi {
    backend: Arc<dyn PlanningBackend>,
    session: Arc<SessionContext>,
    action_log_repo: Arc<ActionLogRepository>,
    checker: PlanChecker,
    formulas: Latest<Vec<FormulaLine>>,
    stock: Latest<Vec<StockRow>>,
}

fn field_label(field: &str) -> &'static str {
    match field {
        "department" => "Department is required",
        "color_code" => "Product code is required",
        "lot" => "Lot is required",
        "percent" => "Percent is required",
        "date" => "Date is required",
        _ => "Remark is required",
    }
}

impl PlanApi {
    pub fn new(
        backend: Arc<dyn PlanningBackend>,
        session: Arc<SessionContext>,
        action_log_repo: Arc<ActionLogRepository>,
        low_remaining_kg: f64,
    ) -> Self {
        Self {
            backend,
            session,
            action_log_repo,
            checker: PlanChecker::new(low_remaining_kg),
            formulas: Latest::new("formula"),
            stock: Latest::new("stock"),
        }
    }

    // ==========================================
    // 数据加载
    // ==========================================

    /// 并发拉取配方与库存
    ///
    /// 被更新请求覆盖的响应不会写入缓存, 返回值始终是最新采纳的数据
    #[instrument(skip(self))]
    pub async fn load(&self) -> ApiResult<PlanData> {
        let _perf = PerfGuard::new("plan_load");
        let formula_ticket = self.formulas.begin();
        let stock_ticket = self.stock.begin();

        let (formulas, stock) = tokio::join!(
            self.backend.fetch_formulas(),
            self.backend.fetch_stock()
        );
        self.formulas.apply(&formula_ticket, formulas?);
        self.stock.apply(&stock_ticket, stock?);

        Ok(PlanData {
            formulas: self.formulas.get().unwrap_or_default(),
            stock: self.stock.get().unwrap_or_default(),
        })
    }

    /// 只刷新库存（提交后调用）
    pub async fn refresh_stock(&self) -> ApiResult<Vec<StockRow>> {
        let ticket = self.stock.begin();
        let rows = self.backend.fetch_stock().await?;
        self.stock.apply(&ticket, rows);
        Ok(self.stock.get().unwrap_or_default())
    }

    async fn cached(&self) -> ApiResult<PlanData> {
        match (self.formulas.get(), self.stock.get()) {
            (Some(formulas), Some(stock)) => Ok(PlanData { formulas, stock }),
            _ => self.load().await,
        }
    }

    // ==========================================
    // 检索与核对
    // ==========================================

    /// 产品代码精确匹配（区分大小写）, 备注未选时不过滤
    pub async fn search(
        &self,
        color_code: &str,
        remark: Option<&Remark>,
    ) -> ApiResult<Vec<FormulaLine>> {
        let data = self.cached().await?;
        let code = color_code.trim();
        Ok(data
            .formulas
            .into_iter()
            .filter(|l| l.matches_plan_search(code, remark))
            .collect())
    }

    pub async fn check(&self, form: &PlanForm, adjustments: &AdjustmentBook) -> ApiResult<PlanCheck> {
        let lines = self.search(&form.color_code, form.remark.as_ref()).await?;
        let data = self.cached().await?;
        let inventory = Inventory::from_rows(&data.stock);
        Ok(self
            .checker
            .check(&lines, &inventory, adjustments, &form.request()))
    }

    // ==========================================
    // 提交
    // ==========================================

    /// 校验必填项与库存后 POST /productplan, 成功后刷新库存
    #[instrument(skip(self, form, adjustments), fields(color_code = %form.color_code))]
    pub async fn submit(&self, form: &PlanForm, adjustments: &AdjustmentBook) -> ApiResult<PlanCheck> {
        let _perf = PerfGuard::new("plan_submit");
        let session = self.session.require()?;

        let violations: Vec<FieldViolation> = form
            .missing_fields()
            .into_iter()
            .map(|f| FieldViolation::new(f, field_label(f)))
            .collect();
        if let Some(err) = ApiError::from_violations(violations) {
            return Err(err);
        }

        let check = self.check(form, adjustments).await?;
        if check.ingredients.is_empty() {
            return Err(ApiError::NotFound(format!(
                "No formula found for product code: {}",
                form.color_code.trim()
            )));
        }
        if check.has_shortfall {
            let codes = check
                .ingredients
                .iter()
                .filter(|c| c.shortfall)
                .map(|c| c.chemical_code.clone())
                .collect();
            return Err(ApiError::InsufficientStock { codes });
        }

        let submission = self.build_submission(form, &check)?;
        self.backend.submit_plan(&submission).await?;
        info!(lot = submission.lot, percent = submission.percent, "生产计划已提交");

        audit::record(
            &self.action_log_repo,
            ActionLog::new(ActionType::SubmitPlan, session.actor())
                .with_color_code(&submission.color_code)
                .with_payload(serde_json::to_value(&submission).unwrap_or_default()),
        );

        self.refresh_stock().await?;
        Ok(check)
    }

    fn build_submission(&self, form: &PlanForm, check: &PlanCheck) -> ApiResult<PlanSubmission> {
        let (Some(department), Some(date), Some(remark)) = (form.department, form.date, &form.remark)
        else {
            return Err(ApiError::InvalidInput("计划表单不完整".to_string()));
        };
        Ok(PlanSubmission {
            department: department.as_str().to_string(),
            color_code: form.color_code.trim().to_string(),
            lot: check.request.lot_count,
            date: date.format("%Y-%m-%d").to_string(),
            percent: check.request.target_percent,
            remarks: remark.to_string(),
            updates: check
                .ingredients
                .iter()
                .map(|c| PlanUpdateLine {
                    chemical_code: c.chemical_code.clone(),
                    in_amount: c.in_amount,
                    out_amount: c.out_amount,
                    use_amount: c.use_amount,
                })
                .collect(),
        })
    }
}
