// ==========================================
// 配方库存核对系统 - 文件解析器
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv) / JSON (.json, 对象数组)
// 输出: 每行一个 表头 → 文本值 的映射, 完全空白的行跳过
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

pub type RawRecord = HashMap<String, String>;

/// 上传接口接受的扩展名
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["xlsx", "xls", "csv", "json"];

/// 文件解析接口
pub trait FileParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRecord>>;
}

/// 小写扩展名; 不受支持时报错
pub fn supported_extension(file_name: &str) -> ImportResult<String> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(ImportError::UnsupportedFormat(if ext.is_empty() {
            file_name.to_string()
        } else {
            format!(".{}", ext)
        }))
    }
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn push_non_blank(records: &mut Vec<RawRecord>, row: RawRecord) {
    if row.values().all(|v| v.is_empty()) {
        return;
    }
    records.push(row);
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRecord>> {
        ensure_exists(file_path)?;

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            let row = record
                .iter()
                .enumerate()
                .filter_map(|(idx, value)| {
                    headers
                        .get(idx)
                        .map(|h| (h.clone(), value.trim().to_string()))
                })
                .collect();
            push_non_blank(&mut records, row);
        }

        Ok(records)
    }
}

// ==========================================
// Excel Parser 实现（首个工作表, 首行为表头）
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRecord>> {
        ensure_exists(file_path)?;

        let mut workbook = open_workbook_auto(file_path)?;
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        let mut rows = range.rows();
        let header_row = match rows.next() {
            Some(r) => r,
            None => return Ok(Vec::new()),
        };
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let mut records = Vec::new();
        for data_row in rows {
            let row = data_row
                .iter()
                .enumerate()
                .filter_map(|(idx, cell)| {
                    headers
                        .get(idx)
                        .map(|h| (h.clone(), cell.to_string().trim().to_string()))
                })
                .collect();
            push_non_blank(&mut records, row);
        }

        Ok(records)
    }
}

// ==========================================
// JSON Parser 实现（顶层为对象数组）
// ==========================================
pub struct JsonParser;

impl FileParser for JsonParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRecord>> {
        ensure_exists(file_path)?;

        let file = File::open(file_path)?;
        let value: Value = serde_json::from_reader(std::io::BufReader::new(file))?;
        let items = match value {
            Value::Array(items) => items,
            _ => {
                return Err(ImportError::JsonParseError(
                    "顶层必须是对象数组".to_string(),
                ))
            }
        };

        let mut records = Vec::new();
        for (idx, item) in items.into_iter().enumerate() {
            let Value::Object(map) = item else {
                return Err(ImportError::RowError {
                    row: idx + 1,
                    message: "不是 JSON 对象".to_string(),
                });
            };
            let row = map
                .into_iter()
                .map(|(k, v)| {
                    let text = match v {
                        Value::String(s) => s.trim().to_string(),
                        Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    (k.trim().to_string(), text)
                })
                .collect();
            push_non_blank(&mut records, row);
        }

        Ok(records)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Vec<RawRecord>> {
        let path = file_path.as_ref();
        let ext = supported_extension(&path.to_string_lossy())?;

        match ext.as_str() {
            "csv" => CsvParser.parse_to_raw_records(path),
            "json" => JsonParser.parse_to_raw_records(path),
            _ => ExcelParser.parse_to_raw_records(path),
        }
    }
}
