// ==========================================
// 配方库存核对系统 - 库存推算引擎
// ==========================================
// 职责: 计算单个原料在给定调整下可支持的生产百分比
// 输入: 当前库存 + 未提交入库 - 未提交出库, 配方每批用量, 批数, 目标百分比
// 输出: 可生产百分比 (上限为目标百分比)
// ==========================================
// 红线: 纯函数,不做 IO,不报错；所有异常输入在解析阶段已降级为 0/默认值
// 注意: 结果不做下限截断,调用方负责 max(0, ·)
// ==========================================

use crate::domain::formula::FormulaLine;
use crate::domain::inventory::InventoryRecord;
use crate::domain::plan::{AdjustmentInput, ProductionRequest};
use tracing::instrument;

/// 可生产百分比
///
/// 1. `available = balance + in - out`（可能为负）
/// 2. `need100 = qty_per_lot × lot_count`
/// 3. `available ≤ 0` 或 `need100 == 0` → 0
/// 4. 否则 `min(available / need100 × 100, target_percent)`
pub fn producible_percent(
    balance: f64,
    in_amount: f64,
    out_amount: f64,
    qty_per_lot: f64,
    lot_count: f64,
    target_percent: f64,
) -> f64 {
    let available = balance + in_amount - out_amount;
    let need_for_full = qty_per_lot * lot_count;

    if available <= 0.0 || need_for_full == 0.0 {
        return 0.0;
    }

    (available / need_for_full * 100.0).min(target_percent)
}

// ==========================================
// StockProjector - 类型化入口
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct StockProjector;

impl StockProjector {
    pub fn new() -> Self {
        Self
    }

    /// 对一条配方行做推算；库存记录缺失时余额按 0
    #[instrument(skip(self, inventory, line), fields(chemical = %line.chemical_code))]
    pub fn project(
        &self,
        inventory: Option<&InventoryRecord>,
        line: &FormulaLine,
        adjustment: &AdjustmentInput,
        request: &ProductionRequest,
    ) -> f64 {
        let balance = inventory.map_or(0.0, |r| r.balance);
        producible_percent(
            balance,
            adjustment.in_amount,
            adjustment.out_amount,
            line.quantity_per_lot,
            request.lot_count,
            request.target_percent,
        )
    }
}
