// ==========================================
// 配方库存核对系统 - 原料库存领域模型
// ==========================================
// 用途: 原料（RM）库存快照，全部余额单位为千克
// 来源: 后端 GET /rm，经 backend::wire 归一化
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// InventoryRecord - 单个化学品的可用库存
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub code: String, // 化学品代码（唯一）
    pub balance: f64, // 当前库存 G-TOTAL（kg）
}

// ==========================================
// StockRow - RM 页面的一行库存
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRow {
    pub code: String,
    pub previous_total: f64, // 上次 G-TOTAL
    pub latest_in: f64,      // 最近一次入库
    pub latest_out: f64,     // 最近一次出库
    pub total: f64,          // 当前 G-TOTAL
}

impl StockRow {
    pub fn as_inventory(&self) -> InventoryRecord {
        InventoryRecord {
            code: self.code.clone(),
            balance: self.total,
        }
    }

    /// 代码模糊匹配（大小写不敏感）
    pub fn matches_search(&self, search: &str) -> bool {
        let q = search.trim().to_lowercase();
        q.is_empty() || self.code.to_lowercase().contains(&q)
    }
}

// ==========================================
// StockAdjustment - 入/出库调整（POST /rm/update）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub code: String,
    pub in_amount: f64,
    pub out_amount: f64,
}

impl StockAdjustment {
    pub fn inbound(code: &str, amount: f64) -> Self {
        Self {
            code: code.to_string(),
            in_amount: amount,
            out_amount: 0.0,
        }
    }

    pub fn outbound(code: &str, amount: f64) -> Self {
        Self {
            code: code.to_string(),
            in_amount: 0.0,
            out_amount: amount,
        }
    }
}

// ==========================================
// Inventory - 按代码索引的库存快照
// ==========================================
// 同一代码出现多次时以第一条为准
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    balances: HashMap<String, f64>,
}

impl Inventory {
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = InventoryRecord>,
    {
        let mut balances = HashMap::new();
        for record in records {
            balances.entry(record.code).or_insert(record.balance);
        }
        Self { balances }
    }

    pub fn from_rows(rows: &[StockRow]) -> Self {
        Self::from_records(rows.iter().map(StockRow::as_inventory))
    }

    pub fn get(&self, code: &str) -> Option<InventoryRecord> {
        self.balances.get(code).map(|balance| InventoryRecord {
            code: code.to_string(),
            balance: *balance,
        })
    }

    /// 查不到的化学品按余额 0 处理
    pub fn balance_of(&self, code: &str) -> f64 {
        self.balances.get(code).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str, balance: f64) -> InventoryRecord {
        InventoryRecord {
            code: code.to_string(),
            balance,
        }
    }

    #[test]
    fn test_missing_code_is_zero_balance() {
        let inv = Inventory::from_records(vec![record("CH-01", 120.0)]);
        assert_eq!(inv.balance_of("CH-01"), 120.0);
        assert_eq!(inv.balance_of("CH-99"), 0.0);
        assert!(inv.get("CH-99").is_none());
    }

    #[test]
    fn test_first_duplicate_wins() {
        let inv = Inventory::from_records(vec![record("A", 1.0), record("A", 2.0)]);
        assert_eq!(inv.balance_of("A"), 1.0);
        assert_eq!(inv.len(), 1);
    }

    #[test]
    fn test_adjustment_wire_shape() {
        let adj = StockAdjustment::outbound("CH-01", 12.5);
        let json = serde_json::to_value(&adj).unwrap();
        assert_eq!(json["code"], "CH-01");
        assert_eq!(json["inAmount"], 0.0);
        assert_eq!(json["outAmount"], 12.5);
    }
}
