// ==========================================
// 配方库存核对系统 - 配方领域模型
// ==========================================
// 配方 = 某产品/颜色代码的物料清单（BOM）
// 每行: 化学品代码 + 每批（100%）用量（kg）
// ==========================================

use crate::domain::types::Remark;
use crate::domain::numeric::parse_quantity;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ==========================================
// FormulaLine - 配方行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaLine {
    pub color_code: String,    // 产品/颜色代码
    pub chemical_code: String, // 化学品代码（关联 InventoryRecord.code）
    pub name: String,          // 化学品名称
    pub remark: Option<Remark>,
    pub quantity_per_lot: f64, // 每批 100% 用量（kg）
}

impl FormulaLine {
    /// 生产计划页的精确匹配：产品代码区分大小写，备注未选时不过滤
    pub fn matches_plan_search(&self, color_code: &str, remark: Option<&Remark>) -> bool {
        self.color_code == color_code && remark.map_or(true, |r| self.remark.as_ref() == Some(r))
    }

    /// 配方页的匹配：产品代码大小写不敏感
    pub fn matches_formula_search(&self, color_code: &str, remark: Option<&Remark>) -> bool {
        !self.chemical_code.is_empty()
            && !self.color_code.is_empty()
            && self.color_code.to_lowercase() == color_code.trim().to_lowercase()
            && remark.map_or(true, |r| self.remark.as_ref() == Some(r))
    }
}

// ==========================================
// FormulaBatch - 批量保存配方（POST /formula/batch）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaBatch {
    pub color_code: String,
    pub chemicals: Vec<FormulaChemical>,
    pub remarks: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaChemical {
    pub code: String,
    #[serde(rename = "use")]
    pub use_amount: f64,
}

impl FormulaBatch {
    pub fn from_lines(color_code: &str, remark: &Remark, lines: &[FormulaLine]) -> Self {
        Self {
            color_code: color_code.to_string(),
            chemicals: lines
                .iter()
                .map(|l| FormulaChemical {
                    code: l.chemical_code.clone(),
                    use_amount: l.quantity_per_lot,
                })
                .collect(),
            remarks: remark.to_string(),
        }
    }
}

// ==========================================
// FormulaDraft - 新建配方草稿
// ==========================================
// 输入框内容保持字符串，提交时才解析
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftLine {
    pub chemical_code: String,
    pub name: String,
    pub chemical_use: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormulaDraft {
    pub color_code: String,
    pub remark: Option<Remark>,
    pub lines: Vec<DraftLine>,
}

/// 草稿编辑错误
#[derive(Error, Debug, PartialEq)]
pub enum DraftError {
    #[error("请先选择备注（Syn. / Pi-1 / Pi-2）")]
    RemarkRequired,

    #[error("请输入配方代码并选择备注")]
    HeaderIncomplete,

    #[error("至少需要一个化学品")]
    NoChemicals,

    #[error("行号越界: {0}")]
    LineOutOfRange(usize),

    #[error("化学品行不完整: 需要代码、名称和用量")]
    LineIncomplete,
}

impl Default for FormulaDraft {
    fn default() -> Self {
        // 新建配方弹窗默认给出三行空白
        Self {
            color_code: String::new(),
            remark: None,
            lines: vec![DraftLine::default(); 3],
        }
    }
}

impl FormulaDraft {
    pub fn new(color_code: &str, remark: Option<Remark>) -> Self {
        Self {
            color_code: color_code.trim().to_string(),
            remark,
            ..Self::default()
        }
    }

    pub fn add_blank_line(&mut self) {
        self.lines.push(DraftLine::default());
    }

    pub fn set_line(&mut self, idx: usize, line: DraftLine) -> Result<(), DraftError> {
        let slot = self
            .lines
            .get_mut(idx)
            .ok_or(DraftError::LineOutOfRange(idx))?;
        *slot = line;
        Ok(())
    }

    /// 有效行: 代码与用量都已填写
    pub fn valid_lines(&self) -> Vec<&DraftLine> {
        self.lines
            .iter()
            .filter(|l| !l.chemical_code.trim().is_empty() && !l.chemical_use.trim().is_empty())
            .collect()
    }

    /// 转换为提交负载；用量按 parse-or-zero 解析
    pub fn to_batch(&self) -> Result<FormulaBatch, DraftError> {
        let remark = match (&self.remark, self.color_code.trim().is_empty()) {
            (Some(r), false) => r,
            _ => return Err(DraftError::HeaderIncomplete),
        };

        let valid = self.valid_lines();
        if valid.is_empty() {
            return Err(DraftError::NoChemicals);
        }

        Ok(FormulaBatch {
            color_code: self.color_code.trim().to_string(),
            chemicals: valid
                .into_iter()
                .map(|l| FormulaChemical {
                    code: l.chemical_code.trim().to_string(),
                    use_amount: parse_quantity(&l.chemical_use),
                })
                .collect(),
            remarks: remark.to_string(),
        })
    }
}

// ==========================================
// FormulaEditor - 已有配方的本地编辑
// ==========================================
// 对应配方页表格上的 增加 / 修改用量 / 删除，最后整体保存
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaEditor {
    pub color_code: String,
    pub remark: Option<Remark>,
    pub lines: Vec<FormulaLine>,
}

impl FormulaEditor {
    pub fn new(color_code: &str, remark: Option<Remark>, lines: Vec<FormulaLine>) -> Self {
        Self {
            color_code: color_code.trim().to_string(),
            remark,
            lines,
        }
    }

    fn require_remark(&self) -> Result<&Remark, DraftError> {
        self.remark.as_ref().ok_or(DraftError::RemarkRequired)
    }

    pub fn add_line(&mut self, line: DraftLine) -> Result<(), DraftError> {
        let remark = self.require_remark()?.clone();
        if self.color_code.is_empty()
            || line.chemical_code.trim().is_empty()
            || line.name.trim().is_empty()
            || line.chemical_use.trim().is_empty()
        {
            return Err(DraftError::LineIncomplete);
        }
        self.lines.push(FormulaLine {
            color_code: self.color_code.clone(),
            chemical_code: line.chemical_code.trim().to_string(),
            name: line.name.trim().to_string(),
            remark: Some(remark),
            quantity_per_lot: parse_quantity(&line.chemical_use),
        });
        Ok(())
    }

    pub fn edit_use(&mut self, idx: usize, chemical_use: &str) -> Result<(), DraftError> {
        self.require_remark()?;
        let line = self
            .lines
            .get_mut(idx)
            .ok_or(DraftError::LineOutOfRange(idx))?;
        line.quantity_per_lot = parse_quantity(chemical_use);
        Ok(())
    }

    pub fn remove_line(&mut self, idx: usize) -> Result<FormulaLine, DraftError> {
        self.require_remark()?;
        if idx >= self.lines.len() {
            return Err(DraftError::LineOutOfRange(idx));
        }
        Ok(self.lines.remove(idx))
    }

    pub fn to_batch(&self) -> Result<FormulaBatch, DraftError> {
        let remark = self.require_remark()?;
        if self.lines.is_empty() {
            return Err(DraftError::NoChemicals);
        }
        Ok(FormulaBatch::from_lines(&self.color_code, remark, &self.lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(color: &str, chem: &str, remark: Option<Remark>, qty: f64) -> FormulaLine {
        FormulaLine {
            color_code: color.to_string(),
            chemical_code: chem.to_string(),
            name: "Unknown".to_string(),
            remark,
            quantity_per_lot: qty,
        }
    }

    #[test]
    fn test_plan_search_is_case_sensitive_and_filters_remark() {
        let l = line("RED-01", "CH1", Some(Remark::Syn), 10.0);
        assert!(l.matches_plan_search("RED-01", None));
        assert!(l.matches_plan_search("RED-01", Some(&Remark::Syn)));
        assert!(!l.matches_plan_search("red-01", None));
        assert!(!l.matches_plan_search("RED-01", Some(&Remark::Pi1)));
    }

    #[test]
    fn test_formula_search_is_case_insensitive() {
        let l = line("RED-01", "CH1", Some(Remark::Pi2), 10.0);
        assert!(l.matches_formula_search("red-01", Some(&Remark::Pi2)));
        assert!(!line("RED-01", "", None, 1.0).matches_formula_search("RED-01", None));
    }

    #[test]
    fn test_draft_requires_header_and_a_valid_line() {
        let mut draft = FormulaDraft::new("BLUE-7", None);
        assert_eq!(draft.to_batch(), Err(DraftError::HeaderIncomplete));

        draft.remark = Some(Remark::Pi1);
        assert_eq!(draft.to_batch(), Err(DraftError::NoChemicals));

        draft
            .set_line(
                1,
                DraftLine {
                    chemical_code: "CH-9".to_string(),
                    name: String::new(),
                    chemical_use: "1,250.5".to_string(),
                },
            )
            .unwrap();
        let batch = draft.to_batch().unwrap();
        assert_eq!(batch.remarks, "Pi-1");
        assert_eq!(batch.chemicals.len(), 1);
        assert_eq!(batch.chemicals[0].use_amount, 1250.5);

        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["colorCode"], "BLUE-7");
        assert_eq!(json["chemicals"][0]["use"], 1250.5);
    }

    #[test]
    fn test_editor_guards_on_remark() {
        let mut editor = FormulaEditor::new("RED-01", None, vec![line("RED-01", "A", None, 1.0)]);
        assert_eq!(editor.edit_use(0, "5"), Err(DraftError::RemarkRequired));

        editor.remark = Some(Remark::Syn);
        editor.edit_use(0, "5").unwrap();
        assert_eq!(editor.lines[0].quantity_per_lot, 5.0);
        assert_eq!(editor.remove_line(3), Err(DraftError::LineOutOfRange(3)));

        editor
            .add_line(DraftLine {
                chemical_code: "B".to_string(),
                name: "Binder".to_string(),
                chemical_use: "2".to_string(),
            })
            .unwrap();
        assert_eq!(editor.lines.len(), 2);
        assert_eq!(editor.lines[1].remark, Some(Remark::Syn));

        let removed = editor.remove_line(0).unwrap();
        assert_eq!(removed.chemical_code, "A");
        assert_eq!(editor.to_batch().unwrap().chemicals.len(), 1);
    }
}
