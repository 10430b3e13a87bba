// ==========================================
// 配方库存核对系统 - 生产计划核对引擎
// ==========================================
// 职责: 对一个配方的全部原料逐行推算,汇总为计划级结论
// 输入: 配方行 + 库存快照 + 未提交调整 + 生产请求
// 输出: PlanCheck (逐行用量/差额/提示等级 + 实际可生产百分比)
// ==========================================
// 红线: 实际可生产百分比 = max(0, min(100, min_i percent_i))
// 红线: 任一原料 available < use_amount 即为缺料,禁止提交
// ==========================================

use crate::domain::formula::FormulaLine;
use crate::domain::inventory::Inventory;
use crate::domain::plan::{AdjustmentBook, PlanForm, ProductionRequest};
use crate::domain::types::IngredientNotice;
use crate::engine::stock_projector::producible_percent;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// 默认"用后剩余偏低"阈值（kg）
pub const DEFAULT_LOW_REMAINING_KG: f64 = 1000.0;

// ==========================================
// IngredientCheck - 单个原料核对结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientCheck {
    pub chemical_code: String,
    pub name: String,
    pub quantity_per_lot: f64,
    pub balance: f64,
    pub in_amount: f64,
    pub out_amount: f64,
    pub available: f64,    // balance + in - out
    pub use_amount: f64,   // qty × lot × percent / 100
    pub diff: f64,         // available - use_amount
    pub shortfall: bool,   // available < use_amount
    pub producible_percent: f64,
    pub notice: IngredientNotice,
}

// ==========================================
// LimitingIngredient - 限制产量的原料
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitingIngredient {
    pub chemical_code: String,
    pub producible_percent: f64,
}

// ==========================================
// PlanCheck - 计划级核对结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanCheck {
    pub request: ProductionRequest,
    pub ingredients: Vec<IngredientCheck>,
    pub actual_percent: f64,
    pub limiting: Option<LimitingIngredient>,
    pub has_shortfall: bool,
}

impl PlanCheck {
    /// 需要在提示栏显示的原料
    pub fn notices(&self) -> impl Iterator<Item = &IngredientCheck> {
        self.ingredients
            .iter()
            .filter(|c| c.notice != IngredientNotice::None)
    }

    /// 表单齐全且不缺料才允许提交
    pub fn can_submit(&self, form: &PlanForm) -> bool {
        form.missing_fields().is_empty() && !self.has_shortfall
    }
}

/// 提示等级判定
pub fn classify_notice(available: f64, use_amount: f64, low_remaining_kg: f64) -> IngredientNotice {
    let diff = available - use_amount;
    // 可用量为负时不提示, 缺料由 has_shortfall 拦截
    if available == 0.0 && diff < 0.0 {
        IngredientNotice::NoRemaining
    } else if available > 0.0 && available < use_amount {
        IngredientNotice::Partial
    } else if available >= use_amount && diff < low_remaining_kg {
        IngredientNotice::LowAfterUse
    } else {
        IngredientNotice::None
    }
}

// ==========================================
// PlanChecker - 计划核对引擎
// ==========================================
#[derive(Debug, Clone)]
pub struct PlanChecker {
    low_remaining_kg: f64,
}

impl Default for PlanChecker {
    fn default() -> Self {
        Self::new(DEFAULT_LOW_REMAINING_KG)
    }
}

impl PlanChecker {
    pub fn new(low_remaining_kg: f64) -> Self {
        Self { low_remaining_kg }
    }

    #[instrument(skip_all, fields(lines = lines.len(), lot = request.lot_count, percent = request.target_percent))]
    pub fn check(
        &self,
        lines: &[FormulaLine],
        inventory: &Inventory,
        adjustments: &AdjustmentBook,
        request: &ProductionRequest,
    ) -> PlanCheck {
        let ingredients: Vec<IngredientCheck> = lines
            .iter()
            .map(|line| self.check_line(line, inventory, adjustments, request))
            .collect();

        // 最小值从 100 起算,没有原料时实际百分比为 100
        let mut min_percent = 100.0_f64;
        let mut limiting: Option<LimitingIngredient> = None;
        for c in &ingredients {
            if c.producible_percent < min_percent {
                min_percent = c.producible_percent;
                limiting = Some(LimitingIngredient {
                    chemical_code: c.chemical_code.clone(),
                    producible_percent: c.producible_percent,
                });
            }
        }

        let has_shortfall = ingredients.iter().any(|c| c.shortfall);

        tracing::debug!(
            actual_percent = min_percent.max(0.0),
            has_shortfall,
            "计划核对完成"
        );

        PlanCheck {
            request: *request,
            ingredients,
            actual_percent: min_percent.max(0.0),
            limiting,
            has_shortfall,
        }
    }

    fn check_line(
        &self,
        line: &FormulaLine,
        inventory: &Inventory,
        adjustments: &AdjustmentBook,
        request: &ProductionRequest,
    ) -> IngredientCheck {
        let balance = inventory.balance_of(&line.chemical_code);
        let adj = adjustments.get(&line.chemical_code);
        let available = balance + adj.in_amount - adj.out_amount;
        let use_amount =
            line.quantity_per_lot * request.lot_count * request.target_percent / 100.0;
        let diff = available - use_amount;

        IngredientCheck {
            chemical_code: line.chemical_code.clone(),
            name: line.name.clone(),
            quantity_per_lot: line.quantity_per_lot,
            balance,
            in_amount: adj.in_amount,
            out_amount: adj.out_amount,
            available,
            use_amount,
            diff,
            shortfall: available < use_amount,
            producible_percent: producible_percent(
                balance,
                adj.in_amount,
                adj.out_amount,
                line.quantity_per_lot,
                request.lot_count,
                request.target_percent,
            ),
            notice: classify_notice(available, use_amount, self.low_remaining_kg),
        }
    }
}
