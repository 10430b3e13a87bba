// ==========================================
// 配方库存核对系统 - 导入层
// ==========================================
// 职责: 库存上传文件在发送前的本地解析与校验
// 支持: Excel, CSV, JSON
// ==========================================

pub mod error;
pub mod file_parser;
pub mod stock_sheet;

pub use error::{ImportError, ImportResult};
pub use file_parser::{
    supported_extension, CsvParser, ExcelParser, FileParser, JsonParser, RawRecord,
    UniversalFileParser, SUPPORTED_EXTENSIONS,
};
pub use stock_sheet::{summarize, validate_stock_file, StockSheetSummary};
