// ==========================================
// 配方库存核对系统 - 后端响应归一化
// ==========================================
// 职责: 每种后端响应一个 Raw 结构, 拉取后立即 normalize() 为领域类型
// 红线: 字段别名/宽松数值只在这里处理, 上层只见强类型记录
// ==========================================
// 宽松数值: number / 数字字符串 / 带千分位逗号 / null / 缺失 → f64 (失败为 0)
// ==========================================

use crate::domain::formula::FormulaLine;
use crate::domain::inventory::StockRow;
use crate::domain::numeric::parse_quantity;
use crate::domain::plan::PlanningRecord;
use crate::domain::types::{Remark, UserRole};
use crate::domain::user::User;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

// ==========================================
// 宽松解码工具
// ==========================================

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => Some(parse_quantity(s)),
        _ => None,
    }
}

/// 缺失或无法识别时为 0
fn loose_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value).unwrap_or(0.0))
}

/// null / 缺失保留为 None
fn loose_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value))
}

/// 数字或字符串形式的标识
fn loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn loose_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// 日期字段只取前 10 位
fn parse_date_prefix(raw: &str) -> Option<NaiveDate> {
    let prefix = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

// ==========================================
// GET /rm
// ==========================================
#[derive(Debug, Clone, Deserialize)]
pub struct RawStockRow {
    #[serde(default, deserialize_with = "loose_string")]
    pub code: String,
    #[serde(default, alias = "G-TOTAL", alias = "G-total", deserialize_with = "loose_f64")]
    pub g_total: f64,
    #[serde(default, deserialize_with = "loose_opt_f64")]
    pub previous_g_total: Option<f64>,
    #[serde(default, deserialize_with = "loose_f64")]
    pub latest_in: f64,
    #[serde(default, deserialize_with = "loose_f64")]
    pub latest_out: f64,
}

impl RawStockRow {
    pub fn normalize(self) -> StockRow {
        // 上次 G-TOTAL 缺失或为 0 时沿用当前值
        let previous_total = match self.previous_g_total {
            Some(v) if v != 0.0 => v,
            _ => self.g_total,
        };
        StockRow {
            code: self.code.trim().to_string(),
            previous_total,
            latest_in: self.latest_in,
            latest_out: self.latest_out,
            total: self.g_total,
        }
    }
}

// ==========================================
// GET /formula, GET /formula/details/{colorCode}
// ==========================================
#[derive(Debug, Clone, Deserialize)]
pub struct RawFormulaRow {
    #[serde(default, rename = "colorCode", alias = "color_code", deserialize_with = "loose_string")]
    pub color_code: String,
    #[serde(default, alias = "chemicalCode", deserialize_with = "loose_string")]
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "remark")]
    pub remarks: Option<String>,
    #[serde(default, rename = "qtyPerLot", alias = "qty_per_lot", deserialize_with = "loose_f64")]
    pub qty_per_lot: f64,
}

impl RawFormulaRow {
    pub fn normalize(self) -> FormulaLine {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        // 与 RawStockRow 一致去除首尾空白, 库存按编码查找时两侧才能对上
        FormulaLine {
            color_code: self.color_code.trim().to_string(),
            chemical_code: self.code.trim().to_string(),
            name,
            remark: self.remarks.as_deref().and_then(Remark::parse),
            quantity_per_lot: self.qty_per_lot,
        }
    }
}

// ==========================================
// GET /planningrecord
// ==========================================
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlanningRecord {
    #[serde(default, alias = "_id", deserialize_with = "loose_string")]
    pub id: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub department: String,
    #[serde(default, rename = "colorCode", alias = "color_code", deserialize_with = "loose_string")]
    pub color_code: String,
    #[serde(default, deserialize_with = "loose_f64")]
    pub lot: f64,
    #[serde(default, deserialize_with = "loose_string")]
    pub date: String,
    #[serde(default, deserialize_with = "loose_opt_f64")]
    pub percent: Option<f64>,
    #[serde(default, alias = "remark")]
    pub remarks: Option<String>,
}

impl RawPlanningRecord {
    pub fn normalize(self) -> PlanningRecord {
        PlanningRecord {
            id: self.id,
            department: self.department,
            color_code: self.color_code,
            lot: self.lot,
            date: self.date,
            percent: self.percent,
            remark: self.remarks.filter(|r| !r.trim().is_empty()),
        }
    }
}

// ==========================================
// 用户
// ==========================================
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUser {
    #[serde(default, alias = "_id", deserialize_with = "loose_string")]
    pub id: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub username: String,
    #[serde(default, alias = "firstName", deserialize_with = "loose_string")]
    pub name: String,
    #[serde(default, alias = "last_name", deserialize_with = "loose_string")]
    pub last_name: String,
    #[serde(default, alias = "employee_id", deserialize_with = "loose_opt_string")]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "birth_date")]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub birth: Option<String>,
}

impl RawUser {
    pub fn normalize(self) -> User {
        let birth_date = self
            .birth_date
            .as_deref()
            .and_then(parse_date_prefix)
            .or_else(|| self.birth.as_deref().and_then(parse_date_prefix));
        User {
            id: self.id,
            username: self.username,
            name: self.name,
            last_name: self.last_name,
            employee_id: self.employee_id,
            role: UserRole::parse_lenient(self.role.as_deref().unwrap_or("")),
            birth_date,
        }
    }
}

/// POST /users/login, /users/admin/login
#[derive(Debug, Clone, Deserialize)]
pub struct RawLoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<RawUser>,
    #[serde(default)]
    pub message: Option<String>,
}

/// GET /users
#[derive(Debug, Clone, Deserialize)]
pub struct RawUsersResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub users: Vec<RawUser>,
}

/// GET /users/verify-token, PUT /users/{id}
#[derive(Debug, Clone, Deserialize)]
pub struct RawUserResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub user: Option<RawUser>,
    #[serde(default)]
    pub message: Option<String>,
}

/// POST /users/check-username
#[derive(Debug, Clone, Deserialize)]
pub struct RawExistsResponse {
    #[serde(default)]
    pub exists: bool,
}

/// 通用 {success, message}
#[derive(Debug, Clone, Deserialize)]
pub struct RawAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RawAck {
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_row_field_spellings() {
        let rows: Vec<RawStockRow> = serde_json::from_str(
            r#"[
                {"code":"A","g_total":"1,250.5","latest_in":10,"latest_out":null},
                {"code":"B","G-TOTAL":80,"previous_g_total":95},
                {"code":"C","G-total":null,"previous_g_total":0}
            ]"#,
        )
        .unwrap();
        let rows: Vec<StockRow> = rows.into_iter().map(RawStockRow::normalize).collect();

        assert_eq!(rows[0].total, 1250.5);
        assert_eq!(rows[0].previous_total, 1250.5);
        assert_eq!(rows[0].latest_in, 10.0);
        assert_eq!(rows[0].latest_out, 0.0);
        assert_eq!(rows[1].total, 80.0);
        assert_eq!(rows[1].previous_total, 95.0);
        assert_eq!(rows[2].total, 0.0);
    }

    #[test]
    fn test_formula_row_defaults() {
        let raw: RawFormulaRow = serde_json::from_str(
            r#"{"colorCode":"RED-01","code":"CH1","remarks":"Pi-2","qtyPerLot":"12.5"}"#,
        )
        .unwrap();
        let line = raw.normalize();
        assert_eq!(line.name, "Unknown");
        assert_eq!(line.remark, Some(Remark::Pi2));
        assert_eq!(line.quantity_per_lot, 12.5);

        let raw: RawFormulaRow =
            serde_json::from_str(r#"{"colorCode":"X","code":"Y","qtyPerLot":null,"remarks":""}"#)
                .unwrap();
        let line = raw.normalize();
        assert_eq!(line.quantity_per_lot, 0.0);
        assert_eq!(line.remark, None);
    }

    #[test]
    fn test_padded_codes_match_between_formula_and_stock() {
        let stock: Vec<RawStockRow> =
            serde_json::from_str(r#"[{"code":"CH-01 ","g_total":5000}]"#).unwrap();
        let rows: Vec<StockRow> = stock.into_iter().map(RawStockRow::normalize).collect();
        let inventory = crate::domain::inventory::Inventory::from_rows(&rows);

        let raw: RawFormulaRow = serde_json::from_str(
            r#"{"colorCode":" RED-01","code":"CH-01 ","remarks":"Syn.","qtyPerLot":10}"#,
        )
        .unwrap();
        let line = raw.normalize();
        assert_eq!(line.color_code, "RED-01");
        assert_eq!(line.chemical_code, "CH-01");
        assert_eq!(inventory.balance_of(&line.chemical_code), 5000.0);
    }

    #[test]
    fn test_planning_record_numeric_id() {
        let raw: RawPlanningRecord = serde_json::from_str(
            r#"{"id":42,"department":"C2","colorCode":"BLUE","lot":"3","date":"2025-04-01","percent":null}"#,
        )
        .unwrap();
        let rec = raw.normalize();
        assert_eq!(rec.id, "42");
        assert_eq!(rec.lot, 3.0);
        assert_eq!(rec.percent, None);
    }

    #[test]
    fn test_user_normalize() {
        let raw: RawUser = serde_json::from_str(
            r#"{"id":3,"username":"admin1","name":"Ada","lastName":"L","employeeId":1001,"role":"admin","birth":"1990-02-03T00:00:00.000Z"}"#,
        )
        .unwrap();
        let user = raw.normalize();
        assert_eq!(user.id, "3");
        assert_eq!(user.employee_id.as_deref(), Some("1001"));
        assert_eq!(user.role, UserRole::Admin);
        assert_eq!(user.birth_date, NaiveDate::from_ymd_opt(1990, 2, 3));
    }
}
