// ==========================================
// 配方库存核对系统 - 领域类型定义
// ==========================================
// 职责: 部门、配方备注、用户角色、提示等级等枚举
// 序列化格式: 与后端 REST 接口字段值一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 配方备注 (Remark / Prefix)
// ==========================================
// 同一产品代码下区分配方变体的分类标签
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Remark {
    Syn,           // "Syn."
    Pi1,           // "Pi-1"
    Pi2,           // "Pi-2"
    Other(String), // 后端返回的其他标签，原样保留
}

impl Remark {
    /// 解析备注标签，空字符串视为未选择
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        Some(Remark::from(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Remark::Syn => "Syn.",
            Remark::Pi1 => "Pi-1",
            Remark::Pi2 => "Pi-2",
            Remark::Other(s) => s.as_str(),
        }
    }

    /// 界面下拉框中提供的标准标签
    pub fn standard() -> [Remark; 3] {
        [Remark::Syn, Remark::Pi1, Remark::Pi2]
    }
}

impl From<String> for Remark {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Syn." => Remark::Syn,
            "Pi-1" => Remark::Pi1,
            "Pi-2" => Remark::Pi2,
            _ => Remark::Other(s),
        }
    }
}

impl From<Remark> for String {
    fn from(r: Remark) -> Self {
        r.as_str().to_string()
    }
}

impl fmt::Display for Remark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 生产部门 (Department)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Department {
    B1,
    B2,
    C1,
    C2,
    C3,
    C4,
    C5,
    Pi1,
    Pi2,
}

impl Department {
    pub const ALL: [Department; 9] = [
        Department::B1,
        Department::B2,
        Department::C1,
        Department::C2,
        Department::C3,
        Department::C4,
        Department::C5,
        Department::Pi1,
        Department::Pi2,
    ];

    /// 提交给后端的值（注意 Pi1/Pi2 不带连字符）
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::B1 => "B1",
            Department::B2 => "B2",
            Department::C1 => "C1",
            Department::C2 => "C2",
            Department::C3 => "C3",
            Department::C4 => "C4",
            Department::C5 => "C5",
            Department::Pi1 => "Pi1",
            Department::Pi2 => "Pi2",
        }
    }
}

impl FromStr for Department {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "");
        Department::ALL
            .iter()
            .copied()
            .find(|d| d.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| format!("未知部门: {}", s))
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 用户角色 (User Role)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    /// 宽松解析：大小写不敏感，未知值按普通用户处理
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "ADMIN" => UserRole::Admin,
            _ => UserRole::User,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "ADMIN"),
            UserRole::User => write!(f, "USER"),
        }
    }
}

// ==========================================
// 原料提示等级 (Ingredient Notice)
// ==========================================
// 生产计划页右侧提示栏的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IngredientNotice {
    None,        // 无需提示
    NoRemaining, // 无剩余库存，无法生产（红）
    Partial,     // 只能生产不足目标比例（黄）
    LowAfterUse, // 足够生产但用后剩余偏低（绿）
}

impl IngredientNotice {
    /// i18n 消息键
    pub fn message_key(&self) -> Option<&'static str> {
        match self {
            IngredientNotice::None => None,
            IngredientNotice::NoRemaining => Some("notice.no_remaining"),
            IngredientNotice::Partial => Some("notice.partial"),
            IngredientNotice::LowAfterUse => Some("notice.low_after_use"),
        }
    }
}

// ==========================================
// 库存告警等级 (Stock Alert Level)
// ==========================================
// 顺序: Normal < Low < VeryLow < OutOfStock
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockAlertLevel {
    Normal,
    Low,
    VeryLow,
    OutOfStock,
}

impl StockAlertLevel {
    pub fn message_key(&self) -> &'static str {
        match self {
            StockAlertLevel::Normal => "alert.normal",
            StockAlertLevel::Low => "alert.low",
            StockAlertLevel::VeryLow => "alert.very_low",
            StockAlertLevel::OutOfStock => "alert.out_of_stock",
        }
    }
}

impl fmt::Display for StockAlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockAlertLevel::Normal => write!(f, "NORMAL"),
            StockAlertLevel::Low => write!(f, "LOW"),
            StockAlertLevel::VeryLow => write!(f, "VERY_LOW"),
            StockAlertLevel::OutOfStock => write!(f, "OUT_OF_STOCK"),
        }
    }
}
