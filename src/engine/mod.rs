// ==========================================
// 配方库存核对系统 - 引擎层
// ==========================================
// 职责: 纯计算规则（库存推算、计划核对、告警分级、批数联动、记录筛选）
// 红线: Engine 不做 IO, 不访问网络与数据库
// ==========================================

pub mod lot_adjustment;
pub mod plan_checker;
pub mod record_filter;
pub mod stock_alert;
pub mod stock_projector;

// 重导出核心引擎
pub use lot_adjustment::{decrement, increment, lot_change_adjustments, return_to_stock};
pub use plan_checker::{
    classify_notice, IngredientCheck, LimitingIngredient, PlanCheck, PlanChecker,
    DEFAULT_LOW_REMAINING_KG,
};
pub use record_filter::{compute_stats, format_lot, RecordFilter};
pub use stock_alert::{AlertItem, AlertReport, AlertSummary, AlertThresholds, StockAlertEngine};
pub use stock_projector::{producible_percent, StockProjector};
