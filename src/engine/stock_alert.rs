// ==========================================
// 配方库存核对系统 - 库存告警引擎
// ==========================================
// 职责: 按 G-TOTAL 对原料分级并生成告警报表
// 分级: total == 0 → 缺货; 0 < total < 500 → 极低; 500 ≤ total < 1000 → 偏低
// 红线: 负库存不计入告警
// ==========================================

use crate::domain::inventory::StockRow;
use crate::domain::types::StockAlertLevel;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::instrument;

// ==========================================
// AlertThresholds - 告警阈值（kg）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub very_low_kg: f64,
    pub low_kg: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            very_low_kg: 500.0,
            low_kg: 1000.0,
        }
    }
}

impl AlertThresholds {
    pub fn classify(&self, total: f64) -> StockAlertLevel {
        if total == 0.0 {
            StockAlertLevel::OutOfStock
        } else if total > 0.0 && total < self.very_low_kg {
            StockAlertLevel::VeryLow
        } else if total >= self.very_low_kg && total < self.low_kg {
            StockAlertLevel::Low
        } else {
            StockAlertLevel::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertItem {
    pub no: usize, // 从 1 开始
    pub code: String,
    pub total: f64,
    pub level: StockAlertLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub out_of_stock: usize,
    pub very_low: usize,
    pub low: usize,
}

impl AlertSummary {
    pub fn total(&self) -> usize {
        self.out_of_stock + self.very_low + self.low
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertReport {
    pub generated_at: NaiveDateTime,
    pub thresholds: AlertThresholds,
    pub items: Vec<AlertItem>,
    pub summary: AlertSummary,
}

impl AlertReport {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 导出文件名: RM-Stock-Alert-Report-YYYY-MM-DD.csv
    pub fn file_name(&self) -> String {
        format!(
            "RM-Stock-Alert-Report-{}.csv",
            self.generated_at.format("%Y-%m-%d")
        )
    }
}

// ==========================================
// StockAlertEngine - 告警报表生成
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct StockAlertEngine {
    thresholds: AlertThresholds,
}

impl StockAlertEngine {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> AlertThresholds {
        self.thresholds
    }

    /// 生成告警报表；search 非空时只看代码匹配的行
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub fn build_report(
        &self,
        rows: &[StockRow],
        search: Option<&str>,
        generated_at: NaiveDateTime,
    ) -> AlertReport {
        let mut summary = AlertSummary::default();
        let items: Vec<AlertItem> = rows
            .iter()
            .filter(|r| search.map_or(true, |q| r.matches_search(q)))
            .filter_map(|r| {
                let level = self.thresholds.classify(r.total);
                match level {
                    StockAlertLevel::Normal => None,
                    StockAlertLevel::OutOfStock => {
                        summary.out_of_stock += 1;
                        Some((r, level))
                    }
                    StockAlertLevel::VeryLow => {
                        summary.very_low += 1;
                        Some((r, level))
                    }
                    StockAlertLevel::Low => {
                        summary.low += 1;
                        Some((r, level))
                    }
                }
            })
            .enumerate()
            .map(|(idx, (r, level))| AlertItem {
                no: idx + 1,
                code: r.code.clone(),
                total: r.total,
                level,
            })
            .collect();

        tracing::debug!(alerts = summary.total(), "库存告警统计完成");

        AlertReport {
            generated_at,
            thresholds: self.thresholds,
            items,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(code: &str, total: f64) -> StockRow {
        StockRow {
            code: code.to_string(),
            previous_total: total,
            latest_in: 0.0,
            latest_out: 0.0,
            total,
        }
    }

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_classify_boundaries() {
        let t = AlertThresholds::default();
        assert_eq!(t.classify(0.0), StockAlertLevel::OutOfStock);
        assert_eq!(t.classify(0.5), StockAlertLevel::VeryLow);
        assert_eq!(t.classify(499.99), StockAlertLevel::VeryLow);
        assert_eq!(t.classify(500.0), StockAlertLevel::Low);
        assert_eq!(t.classify(999.0), StockAlertLevel::Low);
        assert_eq!(t.classify(1000.0), StockAlertLevel::Normal);
        assert_eq!(t.classify(-20.0), StockAlertLevel::Normal);
    }

    #[test]
    fn test_report_numbers_and_summary() {
        let rows = vec![
            row("A", 0.0),
            row("B", 5000.0),
            row("C", 120.0),
            row("D", 750.0),
            row("E", -3.0),
        ];
        let report = StockAlertEngine::default().build_report(&rows, None, ts());

        let codes: Vec<&str> = report.items.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["A", "C", "D"]);
        assert_eq!(report.items[2].no, 3);
        assert_eq!(report.summary.out_of_stock, 1);
        assert_eq!(report.summary.very_low, 1);
        assert_eq!(report.summary.low, 1);
        assert_eq!(report.summary.total(), 3);
        assert_eq!(report.file_name(), "RM-Stock-Alert-Report-2025-06-02.csv");
    }

    #[test]
    fn test_report_respects_search() {
        let rows = vec![row("PIG-01", 0.0), row("RES-02", 10.0)];
        let report = StockAlertEngine::default().build_report(&rows, Some("pig"), ts());
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].code, "PIG-01");
    }
}
