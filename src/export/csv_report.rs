// ==========================================
// 配方库存核对系统 - CSV 报表
// ==========================================
// 1. 库存告警报表: 标题 / 生成时间 / 告警条数 / 明细 / 汇总
// 2. 计划记录导出: Department, Product Code, Lot., Date, %
//    有关键字时追加 TOTAL 行（批数合计）
// ==========================================

use crate::domain::plan::PlanningRecord;
use crate::domain::types::StockAlertLevel;
use crate::engine::record_filter::format_lot;
use crate::engine::stock_alert::AlertReport;
use crate::export::{ExportError, ExportResult};
use crate::i18n::t;
use csv::WriterBuilder;
use std::io::Write;
use std::path::{Path, PathBuf};

fn report_status_key(level: StockAlertLevel) -> &'static str {
    match level {
        StockAlertLevel::OutOfStock => "report.status_out_of_stock",
        StockAlertLevel::VeryLow => "report.status_very_low",
        StockAlertLevel::Low => "report.status_low",
        StockAlertLevel::Normal => "report.status_normal",
    }
}

fn format_kg(v: f64) -> String {
    format!("{:.2}", v)
}

/// 库存告警报表; 无告警时返回 Empty("export.no_alerts")
pub fn write_alert_report<W: Write>(report: &AlertReport, writer: W) -> ExportResult<()> {
    if report.is_empty() {
        return Err(ExportError::Empty("export.no_alerts"));
    }

    let mut wtr = WriterBuilder::new().flexible(true).from_writer(writer);
    let very_low = format_lot(report.thresholds.very_low_kg);
    let low_max = format_lot(report.thresholds.low_kg - 1.0);

    wtr.write_record(["RM Stock Alert Report"])?;
    wtr.write_record([format!(
        "Generated on: {}",
        report.generated_at.format("%Y-%m-%d %H:%M")
    )])?;
    wtr.write_record([format!("Total Alert Items: {}", report.items.len())])?;
    wtr.write_record([""])?;

    wtr.write_record(["No.", "Chemical Code", "Current Stock (kg)", "Status"])?;
    for item in &report.items {
        wtr.write_record([
            item.no.to_string(),
            item.code.clone(),
            format_kg(item.total),
            t(report_status_key(item.level)),
        ])?;
    }

    wtr.write_record([""])?;
    wtr.write_record(["ALERT SUMMARY"])?;
    let s = &report.summary;
    wtr.write_record([
        "Critical (Out of Stock)".to_string(),
        s.out_of_stock.to_string(),
        "items".to_string(),
        "Immediate action required".to_string(),
    ])?;
    wtr.write_record([
        format!("High (< {}kg)", very_low),
        s.very_low.to_string(),
        "items".to_string(),
        "Order soon".to_string(),
    ])?;
    wtr.write_record([
        format!("Medium ({}-{}kg)", very_low, low_max),
        s.low.to_string(),
        "items".to_string(),
        "Monitor closely".to_string(),
    ])?;
    wtr.write_record([
        "TOTAL ALERTS".to_string(),
        s.total().to_string(),
        "items".to_string(),
        String::new(),
    ])?;

    wtr.flush()?;
    Ok(())
}

/// 计划记录导出; with_total 为 true 时追加批数合计行
pub fn write_planning_records<W: Write>(
    records: &[&PlanningRecord],
    with_total: bool,
    writer: W,
) -> ExportResult<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(["Department", "Product Code", "Lot.", "Date", "%"])?;

    let mut total_lot = 0.0;
    for r in records {
        let lot = if r.lot.is_finite() { r.lot } else { 0.0 };
        total_lot += lot;
        wtr.write_record([
            r.department.clone(),
            r.color_code.clone(),
            format_lot(lot),
            r.date.clone(),
            r.percent.map(format_lot).unwrap_or_default(),
        ])?;
    }

    if with_total {
        wtr.write_record([
            String::new(),
            "TOTAL".to_string(),
            format_lot(total_lot),
            String::new(),
            String::new(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// 写入 dir/file_name, 返回完整路径
pub fn write_to_file<F>(dir: &Path, file_name: &str, write: F) -> ExportResult<PathBuf>
where
    F: FnOnce(std::fs::File) -> ExportResult<()>,
{
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    let file = std::fs::File::create(&path)?;
    write(file)?;
    tracing::info!(path = %path.display(), "导出完成");
    Ok(path)
}
