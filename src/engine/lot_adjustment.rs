// ==========================================
// 配方库存核对系统 - 批数变更库存联动
// ==========================================
// 职责: 计划记录修改批数/删除时,换算出需要回写的库存调整
// - 批数增加 → 按差值出库 (outAmount)
// - 批数减少 → 按差值入库 (inAmount)
// - 删除记录 → 全部用量退回库存 (inAmount = qty × lot)
// ==========================================

use crate::domain::formula::FormulaLine;
use crate::domain::inventory::StockAdjustment;

/// 批数变更对应的库存调整；批数不变时为空
pub fn lot_change_adjustments(
    formula: &[FormulaLine],
    old_lot: f64,
    new_lot: f64,
) -> Vec<StockAdjustment> {
    let delta = new_lot - old_lot;
    if delta == 0.0 {
        return Vec::new();
    }

    formula
        .iter()
        .map(|line| {
            let amount = line.quantity_per_lot * delta.abs();
            if delta > 0.0 {
                StockAdjustment::outbound(&line.chemical_code, amount)
            } else {
                StockAdjustment::inbound(&line.chemical_code, amount)
            }
        })
        .collect()
}

/// 删除计划记录时退回库存
pub fn return_to_stock(formula: &[FormulaLine], lot: f64) -> Vec<StockAdjustment> {
    formula
        .iter()
        .map(|line| StockAdjustment::inbound(&line.chemical_code, line.quantity_per_lot * lot))
        .collect()
}

/// 草稿批数 +1（非数字按 0 起算）
pub fn increment(draft_lot: f64) -> f64 {
    let base = if draft_lot.is_finite() { draft_lot } else { 0.0 };
    base + 1.0
}

/// 草稿批数 -1，下限为 1（非数字或 0 按 1 起算）
pub fn decrement(draft_lot: f64) -> f64 {
    let base = if draft_lot.is_finite() && draft_lot != 0.0 {
        draft_lot
    } else {
        1.0
    };
    (base - 1.0).max(1.0)
}
