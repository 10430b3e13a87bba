// ==========================================
// 内存版规划后端 - 用于集成测试
// ==========================================
// 行为与 REST 服务一致的最小子集:
// - 库存调整: total += in - out
// - 计划提交: 按 in/out/use 回写库存并生成计划记录
// - 调用按顺序记录在 calls 中, 可注入单次失败
// ==========================================

#![allow(dead_code)]

use async_trait::async_trait;
use formula_stock_checker::backend::{BackendError, BackendResult, LoginOutcome, PlanningBackend};
use formula_stock_checker::domain::{
    Credentials, FormulaBatch, FormulaLine, NewUser, PasswordReset, PlanSubmission, PlanningRecord,
    Remark, StockAdjustment, StockRow, User, UserRole, UserUpdate,
};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::oneshot;

#[derive(Default)]
struct FakeState {
    users: Vec<User>,
    passwords: HashMap<String, String>,
    revoked_tokens: Vec<String>,
    stock: Vec<StockRow>,
    stock_after_upload: Option<Vec<StockRow>>,
    formulas: Vec<FormulaLine>,
    records: Vec<PlanningRecord>,
    submissions: Vec<PlanSubmission>,
    adjustments: Vec<StockAdjustment>,
    uploads: Vec<(String, usize)>,
    calls: Vec<String>,
    fail_on: HashMap<String, (u16, String)>,
    held: HashMap<String, oneshot::Receiver<()>>,
    offline: bool,
}

pub struct FakeBackend {
    state: Mutex<FakeState>,
}

fn token_for(username: &str) -> String {
    format!("token-{}", username)
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ==========================================
    // 测试数据注入
    // ==========================================

    pub fn with_user(self, user: User, password: &str) -> Self {
        {
            let mut s = self.lock();
            s.passwords.insert(user.username.clone(), password.to_string());
            s.users.push(user);
        }
        self
    }

    pub fn with_stock(self, rows: Vec<StockRow>) -> Self {
        self.lock().stock = rows;
        self
    }

    pub fn with_formulas(self, lines: Vec<FormulaLine>) -> Self {
        self.lock().formulas = lines;
        self
    }

    pub fn with_records(self, records: Vec<PlanningRecord>) -> Self {
        self.lock().records = records;
        self
    }

    /// 上传成功后服务器端的库存
    pub fn set_stock_after_upload(&self, rows: Vec<StockRow>) {
        self.lock().stock_after_upload = Some(rows);
    }

    /// 下一次调用 op 时返回 HTTP 错误
    pub fn fail_next(&self, op: &str, status: u16, message: &str) {
        self.lock()
            .fail_on
            .insert(op.to_string(), (status, message.to_string()));
    }

    /// 下一次调用 op 时先取数据再挂起, 直到返回的 Sender 发送或被丢弃
    pub fn hold_next(&self, op: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.lock().held.insert(op.to_string(), rx);
        tx
    }

    pub fn replace_stock(&self, rows: Vec<StockRow>) {
        self.lock().stock = rows;
    }

    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub fn revoke_token(&self, username: &str) {
        self.lock().revoked_tokens.push(token_for(username));
    }

    // ==========================================
    // 观察
    // ==========================================

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, op: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.as_str() == op).count()
    }

    pub fn stock(&self) -> Vec<StockRow> {
        self.lock().stock.clone()
    }

    pub fn total_of(&self, code: &str) -> Option<f64> {
        self.lock().stock.iter().find(|r| r.code == code).map(|r| r.total)
    }

    pub fn formulas(&self) -> Vec<FormulaLine> {
        self.lock().formulas.clone()
    }

    pub fn records(&self) -> Vec<PlanningRecord> {
        self.lock().records.clone()
    }

    pub fn submissions(&self) -> Vec<PlanSubmission> {
        self.lock().submissions.clone()
    }

    pub fn adjustments(&self) -> Vec<StockAdjustment> {
        self.lock().adjustments.clone()
    }

    pub fn uploads(&self) -> Vec<(String, usize)> {
        self.lock().uploads.clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.lock().users.clone()
    }

    pub fn password_of(&self, username: &str) -> Option<String> {
        self.lock().passwords.get(username).cloned()
    }

    // ==========================================
    // 内部
    // ==========================================

    /// 记录调用并检查注入的失败
    fn enter(&self, op: &str) -> BackendResult<std::sync::MutexGuard<'_, FakeState>> {
        let mut s = self.lock();
        s.calls.push(op.to_string());
        if s.offline {
            return Err(BackendError::Connection {
                base_url: "http://fake".to_string(),
                message: "connection refused".to_string(),
            });
        }
        if let Some((status, message)) = s.fail_on.remove(op) {
            return Err(match status {
                401 => BackendError::Unauthorized(message),
                404 => BackendError::NotFound(message),
                _ => BackendError::Server { status, message },
            });
        }
        Ok(s)
    }

    fn authorize(s: &FakeState, token: &str) -> BackendResult<User> {
        if s.revoked_tokens.iter().any(|t| t == token) {
            return Err(BackendError::Unauthorized("Invalid token".to_string()));
        }
        s.users
            .iter()
            .find(|u| token_for(&u.username) == token)
            .cloned()
            .ok_or_else(|| BackendError::Unauthorized("Invalid token".to_string()))
    }

    fn apply_adjustment(s: &mut FakeState, code: &str, in_amount: f64, out_amount: f64) {
        match s.stock.iter_mut().find(|r| r.code == code) {
            Some(row) => {
                row.previous_total = row.total;
                row.latest_in = in_amount;
                row.latest_out = out_amount;
                row.total += in_amount - out_amount;
            }
            None => s.stock.push(StockRow {
                code: code.to_string(),
                previous_total: 0.0,
                latest_in: in_amount,
                latest_out: out_amount,
                total: in_amount - out_amount,
            }),
        }
    }
}

#[async_trait]
impl PlanningBackend for FakeBackend {
    async fn login(&self, credentials: &Credentials) -> BackendResult<LoginOutcome> {
        let s = self.enter("login")?;
        match s.passwords.get(&credentials.username) {
            Some(p) if *p == credentials.password => {}
            _ => {
                return Err(BackendError::Server {
                    status: 400,
                    message: "Invalid username or password".to_string(),
                })
            }
        }
        let user = s
            .users
            .iter()
            .find(|u| u.username == credentials.username)
            .cloned()
            .ok_or_else(|| BackendError::NotFound("User not found".to_string()))?;
        Ok(LoginOutcome {
            token: token_for(&user.username),
            user,
        })
    }

    async fn admin_login(&self, credentials: &Credentials) -> BackendResult<LoginOutcome> {
        let outcome = self.login(credentials).await?;
        if !outcome.user.is_admin() {
            return Err(BackendError::Unauthorized("Admin access only".to_string()));
        }
        Ok(outcome)
    }

    async fn verify_token(&self, token: &str) -> BackendResult<User> {
        let s = self.enter("verify_token")?;
        Self::authorize(&s, token)
    }

    async fn check_username(&self, username: &str) -> BackendResult<bool> {
        let s = self.enter("check_username")?;
        Ok(s.users.iter().any(|u| u.username == username))
    }

    async fn reset_password(&self, token: &str, reset: &PasswordReset) -> BackendResult<()> {
        let mut s = self.enter("reset_password")?;
        Self::authorize(&s, token)?;
        if s.passwords.get(&reset.username) == Some(&reset.new_password) {
            return Err(BackendError::Server {
                status: 400,
                message: "New password cannot be the same as the old password".to_string(),
            });
        }
        s.passwords
            .insert(reset.username.clone(), reset.new_password.clone());
        Ok(())
    }

    async fn create_user(&self, token: &str, user: &NewUser) -> BackendResult<()> {
        let mut s = self.enter("create_user")?;
        Self::authorize(&s, token)?;
        if s.users.iter().any(|u| u.username == user.username) {
            return Err(BackendError::Server {
                status: 409,
                message: "Username already exists".to_string(),
            });
        }
        let id = format!("u{}", s.users.len() + 1);
        s.users.push(User {
            id,
            username: user.username.clone(),
            name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            employee_id: Some(user.employee_id.to_string()),
            role: user.role,
            birth_date: Some(user.birth_date.date()),
        });
        s.passwords.insert(user.username.clone(), user.password.clone());
        Ok(())
    }

    async fn list_users(&self, token: &str) -> BackendResult<Vec<User>> {
        let s = self.enter("list_users")?;
        Self::authorize(&s, token)?;
        Ok(s.users.clone())
    }

    async fn update_user(&self, token: &str, id: &str, update: &UserUpdate) -> BackendResult<User> {
        let mut s = self.enter("update_user")?;
        Self::authorize(&s, token)?;
        let user = s
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| BackendError::NotFound("User not found".to_string()))?;
        if let Some(name) = &update.name {
            user.name = name.clone();
        }
        if let Some(last_name) = &update.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(employee_id) = &update.employee_id {
            user.employee_id = Some(employee_id.clone());
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if update.birth_date.is_some() {
            user.birth_date = update.birth_date;
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, token: &str, id: &str) -> BackendResult<()> {
        let mut s = self.enter("delete_user")?;
        Self::authorize(&s, token)?;
        s.users.retain(|u| u.id != id);
        Ok(())
    }

    async fn fetch_stock(&self) -> BackendResult<Vec<StockRow>> {
        let (rows, held) = {
            let mut s = self.enter("fetch_stock")?;
            let held = s.held.remove("fetch_stock");
            (s.stock.clone(), held)
        };
        if let Some(rx) = held {
            let _ = rx.await;
        }
        Ok(rows)
    }

    async fn update_stock(&self, adjustment: &StockAdjustment) -> BackendResult<()> {
        let mut s = self.enter("update_stock")?;
        Self::apply_adjustment(&mut s, &adjustment.code, adjustment.in_amount, adjustment.out_amount);
        s.adjustments.push(adjustment.clone());
        Ok(())
    }

    async fn upload_stock(&self, file_name: &str, bytes: Vec<u8>) -> BackendResult<()> {
        let mut s = self.enter("upload_stock")?;
        s.uploads.push((file_name.to_string(), bytes.len()));
        if let Some(rows) = s.stock_after_upload.take() {
            s.stock = rows;
        }
        Ok(())
    }

    async fn fetch_formulas(&self) -> BackendResult<Vec<FormulaLine>> {
        let s = self.enter("fetch_formulas")?;
        Ok(s.formulas.clone())
    }

    async fn fetch_formula_details(&self, color_code: &str) -> BackendResult<Vec<FormulaLine>> {
        let s = self.enter("fetch_formula_details")?;
        Ok(s
            .formulas
            .iter()
            .filter(|l| l.color_code == color_code)
            .cloned()
            .collect())
    }

    async fn save_formula(&self, batch: &FormulaBatch) -> BackendResult<()> {
        let mut s = self.enter("save_formula")?;
        let remark = Remark::parse(&batch.remarks);
        s.formulas
            .retain(|l| !(l.color_code == batch.color_code && l.remark == remark));
        for c in &batch.chemicals {
            s.formulas.push(FormulaLine {
                color_code: batch.color_code.clone(),
                chemical_code: c.code.clone(),
                name: c.code.clone(),
                remark: remark.clone(),
                quantity_per_lot: c.use_amount,
            });
        }
        Ok(())
    }

    async fn delete_formula(&self, color_code: &str, remark: &Remark) -> BackendResult<()> {
        let mut s = self.enter("delete_formula")?;
        let before = s.formulas.len();
        s.formulas
            .retain(|l| !(l.color_code == color_code && l.remark.as_ref() == Some(remark)));
        if s.formulas.len() == before {
            return Err(BackendError::NotFound("Formula not found".to_string()));
        }
        Ok(())
    }

    async fn submit_plan(&self, submission: &PlanSubmission) -> BackendResult<()> {
        let mut s = self.enter("submit_plan")?;
        for u in &submission.updates {
            Self::apply_adjustment(&mut s, &u.chemical_code, u.in_amount, u.out_amount + u.use_amount);
        }
        let id = format!("p{}", s.records.len() + 1);
        s.records.push(PlanningRecord {
            id,
            department: submission.department.clone(),
            color_code: submission.color_code.clone(),
            lot: submission.lot,
            date: submission.date.clone(),
            percent: Some(submission.percent),
            remark: Some(submission.remarks.clone()),
        });
        s.submissions.push(submission.clone());
        Ok(())
    }

    async fn fetch_planning_records(&self) -> BackendResult<Vec<PlanningRecord>> {
        let s = self.enter("fetch_planning_records")?;
        Ok(s.records.clone())
    }

    async fn update_planning_record_lot(&self, id: &str, lot: f64) -> BackendResult<()> {
        let mut s = self.enter("update_planning_record_lot")?;
        let record = s
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| BackendError::NotFound("Record not found".to_string()))?;
        record.lot = lot;
        Ok(())
    }

    async fn delete_planning_record(&self, id: &str) -> BackendResult<()> {
        let mut s = self.enter("delete_planning_record")?;
        s.records.retain(|r| r.id != id);
        Ok(())
    }
}

/// 管理员与普通用户各一个
pub fn default_users(backend: FakeBackend) -> FakeBackend {
    backend
        .with_user(crate::test_helpers::user("1", "admin1", UserRole::Admin), "Admin@123")
        .with_user(crate::test_helpers::user("2", "worker1", UserRole::User), "Worker@123")
}
