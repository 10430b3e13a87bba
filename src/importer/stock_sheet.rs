// ==========================================
// 配方库存核对系统 - 库存上传文件校验
// ==========================================
// 上传前在本地确认文件可读: 必须有 code 列且至少一行带编码的数据
// 列名匹配忽略大小写与首尾空白
// ==========================================

use crate::domain::numeric::parse_quantity;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{RawRecord, UniversalFileParser};
use std::collections::BTreeSet;
use std::path::Path;

const CODE_COLUMN: &str = "code";
const TOTAL_COLUMNS: [&str; 3] = ["g_total", "g-total", "total"];

/// 校验摘要
#[derive(Debug, Clone, PartialEq)]
pub struct StockSheetSummary {
    pub file_name: String,
    pub row_count: usize,
    pub distinct_codes: usize,
    pub blank_code_rows: Vec<usize>, // 1-based 数据行号
    pub duplicate_codes: Vec<String>,
    pub has_total_column: bool,
    pub total_kg: f64,
}

fn find_column(record: &RawRecord, candidates: &[&str]) -> Option<String> {
    record
        .keys()
        .find(|k| candidates.contains(&k.trim().to_lowercase().as_str()))
        .cloned()
}

/// 解析并校验已读取的记录
pub fn summarize(file_name: &str, records: &[RawRecord]) -> ImportResult<StockSheetSummary> {
    let first = records.first().ok_or(ImportError::NoDataRows)?;
    let code_col = find_column(first, &[CODE_COLUMN])
        .ok_or_else(|| ImportError::MissingColumn(CODE_COLUMN.to_string()))?;
    let total_col = find_column(first, &TOTAL_COLUMNS);

    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    let mut blank_code_rows = Vec::new();
    let mut total_kg = 0.0;

    for (idx, record) in records.iter().enumerate() {
        let code = record.get(&code_col).map(|c| c.trim()).unwrap_or("");
        if code.is_empty() {
            blank_code_rows.push(idx + 1);
            continue;
        }
        if !seen.insert(code.to_string()) {
            duplicates.insert(code.to_string());
        }
        if let Some(col) = &total_col {
            total_kg += record.get(col).map(|v| parse_quantity(v)).unwrap_or(0.0);
        }
    }

    if seen.is_empty() {
        return Err(ImportError::NoDataRows);
    }

    Ok(StockSheetSummary {
        file_name: file_name.to_string(),
        row_count: records.len(),
        distinct_codes: seen.len(),
        blank_code_rows,
        duplicate_codes: duplicates.into_iter().collect(),
        has_total_column: total_col.is_some(),
        total_kg,
    })
}

/// 读取文件并校验
pub fn validate_stock_file(path: &Path) -> ImportResult<StockSheetSummary> {
    let records = UniversalFileParser.parse(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let summary = summarize(&file_name, &records)?;

    tracing::info!(
        file = %summary.file_name,
        rows = summary.row_count,
        codes = summary.distinct_codes,
        blank_code_rows = summary.blank_code_rows.len(),
        duplicates = summary.duplicate_codes.len(),
        "库存文件本地校验通过"
    );
    Ok(summary)
}
