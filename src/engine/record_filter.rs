// ==========================================
// 配方库存核对系统 - 计划记录筛选与统计
// ==========================================
// 职责: 日期区间 + 产品代码关键字筛选; 批数统计; 导出文件命名
// 日期: 只比较前 10 位 (YYYY-MM-DD), 区间两端均包含, 未填则不限
// ==========================================

use crate::domain::plan::{PlanningRecord, RecordStats};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// RecordFilter - 筛选条件
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub search: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl RecordFilter {
    pub fn new(search: &str, start_date: Option<&str>, end_date: Option<&str>) -> Self {
        Self {
            search: search.to_string(),
            start_date: start_date.filter(|s| !s.is_empty()).map(str::to_string),
            end_date: end_date.filter(|s| !s.is_empty()).map(str::to_string),
        }
    }

    /// 去空格、转小写后的关键字；空关键字返回 None
    pub fn query(&self) -> Option<String> {
        let q = self.search.trim().to_lowercase();
        if q.is_empty() {
            None
        } else {
            Some(q)
        }
    }

    pub fn has_date_range(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }

    pub fn in_range(&self, record: &PlanningRecord) -> bool {
        let d = record.date_key();
        self.start_date.as_deref().map_or(true, |s| d >= s)
            && self.end_date.as_deref().map_or(true, |e| d <= e)
    }

    pub fn matches(&self, record: &PlanningRecord) -> bool {
        self.in_range(record)
            && self
                .query()
                .map_or(true, |q| record.color_code.to_lowercase().contains(&q))
    }

    pub fn apply<'a>(&self, records: &'a [PlanningRecord]) -> Vec<&'a PlanningRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }

    /// 筛选结果为空时的提示消息键
    pub fn empty_message_key(&self) -> &'static str {
        match (self.query().is_some(), self.has_date_range()) {
            (true, true) => "export.empty_code_and_range",
            (true, false) => "export.empty_code",
            (false, true) => "export.empty_range",
            (false, false) => "export.empty",
        }
    }

    /// 导出文件名: planR_export[_关键字][_起-to-止]_YYYYMMDD_HHMM.csv
    pub fn export_file_name(&self, now: NaiveDateTime) -> String {
        let mut parts = vec!["planR_export".to_string()];
        if let Some(q) = self.query() {
            parts.push(file_name_safe(&q));
        }
        if self.has_date_range() {
            parts.push(format!(
                "{}-to-{}",
                self.start_date.as_deref().unwrap_or("min"),
                self.end_date.as_deref().unwrap_or("max")
            ));
        }
        format!("{}_{}.csv", parts.join("_"), now.format("%Y%m%d_%H%M"))
    }
}

/// 文件名片段: 只保留 [A-Za-z0-9._-], 其余字符替换为 '_'
fn file_name_safe(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// 统计: 记录数、批数合计、批数分布
pub fn compute_stats<'a, I>(records: I) -> RecordStats
where
    I: IntoIterator<Item = &'a PlanningRecord>,
{
    let mut stats = RecordStats::default();
    let mut freq: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        stats.total_records += 1;
        let lot = if record.lot.is_finite() { record.lot } else { 0.0 };
        stats.total_lots += lot;
        let key = if lot == 0.0 {
            "-".to_string()
        } else {
            format_lot(lot)
        };
        *freq.entry(key).or_insert(0) += 1;
    }
    stats.lot_frequency = freq;
    stats
}

/// 批数显示: 整数不带小数点
pub fn format_lot(lot: f64) -> String {
    if lot.fract() == 0.0 {
        format!("{}", lot as i64)
    } else {
        format!("{}", lot)
    }
}
