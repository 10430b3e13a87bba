// ==========================================
// 配方库存核对系统 - 操作日志领域模型
// ==========================================
// 红线: 所有经由本客户端发起的写操作必须记录
// 用途: 本地审计追踪（谁、何时、对哪个产品代码做了什么）
// 对齐: db.rs action_log 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub action_type: String,
    pub action_ts: NaiveDateTime,
    pub actor: String,
    pub color_code: Option<String>, // 涉及的产品代码
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    Login,
    Logout,
    SubmitPlan,    // 提交生产计划
    UpdateStock,   // 手工入/出库
    UploadStock,   // 上传库存文件
    SaveFormula,   // 保存配方
    DeleteFormula, // 删除整个配方
    EditRecordLot, // 修改计划记录批数
    DeleteRecord,  // 删除计划记录
    ExportAlert,   // 导出库存告警
    ExportRecords, // 导出计划记录
    CreateUser,
    UpdateUser,
    DeleteUser,
    ResetPassword,
    UpdateConfig,  // 修改本地配置
}

impl ActionType {
    pub const ALL: [ActionType; 16] = [
        ActionType::Login,
        ActionType::Logout,
        ActionType::SubmitPlan,
        ActionType::UpdateStock,
        ActionType::UploadStock,
        ActionType::SaveFormula,
        ActionType::DeleteFormula,
        ActionType::EditRecordLot,
        ActionType::DeleteRecord,
        ActionType::ExportAlert,
        ActionType::ExportRecords,
        ActionType::CreateUser,
        ActionType::UpdateUser,
        ActionType::DeleteUser,
        ActionType::ResetPassword,
        ActionType::UpdateConfig,
    ];

    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Login => "Login",
            ActionType::Logout => "Logout",
            ActionType::SubmitPlan => "SubmitPlan",
            ActionType::UpdateStock => "UpdateStock",
            ActionType::UploadStock => "UploadStock",
            ActionType::SaveFormula => "SaveFormula",
            ActionType::DeleteFormula => "DeleteFormula",
            ActionType::EditRecordLot => "EditRecordLot",
            ActionType::DeleteRecord => "DeleteRecord",
            ActionType::ExportAlert => "ExportAlert",
            ActionType::ExportRecords => "ExportRecords",
            ActionType::CreateUser => "CreateUser",
            ActionType::UpdateUser => "UpdateUser",
            ActionType::DeleteUser => "DeleteUser",
            ActionType::ResetPassword => "ResetPassword",
            ActionType::UpdateConfig => "UpdateConfig",
        }
    }

    /// 从字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }
}

impl ActionLog {
    /// 创建新的操作日志（ID 自动生成，时间取当前 UTC）
    pub fn new(action_type: ActionType, actor: &str) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.as_str().to_string(),
            action_ts: chrono::Utc::now().naive_utc(),
            actor: actor.to_string(),
            color_code: None,
            payload_json: None,
            detail: None,
        }
    }

    pub fn with_color_code(mut self, color_code: &str) -> Self {
        self.color_code = Some(color_code.to_string());
        self
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn kind(&self) -> Option<ActionType> {
        ActionType::parse(&self.action_type)
    }
}
