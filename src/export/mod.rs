// ==========================================
// 配方库存核对系统 - 导出层
// ==========================================
// 格式: CSV（Excel 可直接打开）
// ==========================================

pub mod csv_report;

use thiserror::Error;

/// 导出错误
#[derive(Error, Debug)]
pub enum ExportError {
    /// 没有可导出的数据; 参数为 i18n 消息键
    #[error("没有可导出的数据: {0}")]
    Empty(&'static str),

    #[error("CSV 写入失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("文件写入失败: {0}")]
    Io(#[from] std::io::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

pub use csv_report::{write_alert_report, write_planning_records, write_to_file};
