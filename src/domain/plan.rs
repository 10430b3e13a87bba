// ==========================================
// 配方库存核对系统 - 生产计划领域模型
// ==========================================
// 包含: 生产请求（批数/百分比）、入出库调整、计划表单、
//       计划提交负载、计划记录
// ==========================================

use crate::domain::numeric::{is_blank, parse_or_default, parse_or_zero};
use crate::domain::types::{Department, Remark};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 批数默认值
pub const DEFAULT_LOT_COUNT: f64 = 1.0;

/// 目标百分比默认值
pub const DEFAULT_TARGET_PERCENT: f64 = 100.0;

// ==========================================
// ProductionRequest - 生产请求
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductionRequest {
    pub lot_count: f64,      // 批数（未填/非数字/0 → 1）
    pub target_percent: f64, // 目标百分比（未填/非数字/0 → 100）
}

impl Default for ProductionRequest {
    fn default() -> Self {
        Self {
            lot_count: DEFAULT_LOT_COUNT,
            target_percent: DEFAULT_TARGET_PERCENT,
        }
    }
}

impl ProductionRequest {
    pub fn new(lot_count: f64, target_percent: f64) -> Self {
        Self {
            lot_count,
            target_percent,
        }
    }

    /// 从输入框文本构造
    pub fn from_inputs(lot_input: &str, percent_input: &str) -> Self {
        Self {
            lot_count: parse_or_default(lot_input, DEFAULT_LOT_COUNT),
            target_percent: parse_or_default(percent_input, DEFAULT_TARGET_PERCENT),
        }
    }
}

// ==========================================
// AdjustmentInput - 尚未提交的入/出库
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentInput {
    pub in_amount: f64,
    pub out_amount: f64,
}

impl AdjustmentInput {
    pub fn new(in_amount: f64, out_amount: f64) -> Self {
        Self {
            in_amount,
            out_amount,
        }
    }

    pub fn from_inputs(in_input: &str, out_input: &str) -> Self {
        Self {
            in_amount: parse_or_zero(in_input),
            out_amount: parse_or_zero(out_input),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.in_amount == 0.0 && self.out_amount == 0.0
    }
}

// ==========================================
// AdjustmentBook - 按化学品代码记录的调整
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct AdjustmentBook {
    entries: HashMap<String, AdjustmentInput>,
}

impl AdjustmentBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_in(&mut self, chemical_code: &str, input: &str) {
        self.entries
            .entry(chemical_code.to_string())
            .or_default()
            .in_amount = parse_or_zero(input);
    }

    pub fn set_out(&mut self, chemical_code: &str, input: &str) {
        self.entries
            .entry(chemical_code.to_string())
            .or_default()
            .out_amount = parse_or_zero(input);
    }

    pub fn set(&mut self, chemical_code: &str, adjustment: AdjustmentInput) {
        self.entries.insert(chemical_code.to_string(), adjustment);
    }

    /// 未录入的化学品视为 0/0
    pub fn get(&self, chemical_code: &str) -> AdjustmentInput {
        self.entries.get(chemical_code).copied().unwrap_or_default()
    }

    /// 确认弹窗只列出有非零调整的化学品
    pub fn non_zero(&self) -> Vec<(&str, AdjustmentInput)> {
        let mut out: Vec<(&str, AdjustmentInput)> = self
            .entries
            .iter()
            .filter(|(_, a)| !a.is_zero())
            .map(|(code, a)| (code.as_str(), *a))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ==========================================
// PlanForm - 生产计划表单
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct PlanForm {
    pub department: Option<Department>,
    pub color_code: String,
    pub remark: Option<Remark>,
    pub lot_input: String,
    pub percent_input: String,
    pub date: Option<NaiveDate>,
}

impl PlanForm {
    pub fn request(&self) -> ProductionRequest {
        ProductionRequest::from_inputs(&self.lot_input, &self.percent_input)
    }

    /// 缺失的必填字段
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.department.is_none() {
            missing.push("department");
        }
        if is_blank(&self.color_code) {
            missing.push("color_code");
        }
        if is_blank(&self.lot_input) {
            missing.push("lot");
        }
        if is_blank(&self.percent_input) {
            missing.push("percent");
        }
        if self.date.is_none() {
            missing.push("date");
        }
        if self.remark.is_none() {
            missing.push("remark");
        }
        missing
    }
}

// ==========================================
// PlanSubmission - 计划提交（POST /productplan）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSubmission {
    pub department: String,
    pub color_code: String,
    pub lot: f64,
    pub date: String, // YYYY-MM-DD
    pub percent: f64,
    pub remarks: String,
    pub updates: Vec<PlanUpdateLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanUpdateLine {
    pub chemical_code: String,
    pub in_amount: f64,
    pub out_amount: f64,
    pub use_amount: f64,
}

// ==========================================
// PlanningRecord - 已提交的计划记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningRecord {
    pub id: String,
    pub department: String,
    pub color_code: String,
    pub lot: f64,
    pub date: String, // 后端原样日期字符串
    pub percent: Option<f64>,
    pub remark: Option<String>,
}

impl PlanningRecord {
    /// 日期比较键: 取前 10 位（YYYY-MM-DD）
    pub fn date_key(&self) -> &str {
        self.date.get(..10).unwrap_or(&self.date)
    }
}

// ==========================================
// RecordStats - 计划记录统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordStats {
    pub total_records: usize,
    pub total_lots: f64,
    pub lot_frequency: std::collections::BTreeMap<String, usize>,
}
