// ==========================================
// 配方库存核对系统 - HTTP 后端实现
// ==========================================
// 工具: reqwest (json + multipart)
// 日志: 请求前 debug 记录方法与路径; 响应后记录状态码;
//       连接失败时 warn 提示服务器地址
// ==========================================

use crate::backend::error::{extract_error_message, BackendError, BackendResult};
use crate::backend::transport::{LoginOutcome, PlanningBackend};
use crate::backend::wire::{
    RawAck, RawExistsResponse, RawFormulaRow, RawLoginResponse, RawPlanningRecord, RawStockRow,
    RawUserResponse, RawUsersResponse,
};
use crate::config::settings::ClientSettings;
use crate::domain::formula::{FormulaBatch, FormulaLine};
use crate::domain::inventory::{StockAdjustment, StockRow};
use crate::domain::plan::{PlanSubmission, PlanningRecord};
use crate::domain::types::Remark;
use crate::domain::user::{Credentials, NewUser, PasswordReset, User, UserUpdate};
use crate::perf;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

// ==========================================
// HttpBackend
// ==========================================
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> BackendResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Request(format!("HTTP 客户端初始化失败: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> BackendResult<Self> {
        Self::new(&settings.base_url, settings.timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// base_url + 逐段转义的路径
    fn url(&self, segments: &[&str]) -> BackendResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| BackendError::Request(format!("无效的服务地址 {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| BackendError::Request(format!("无效的服务地址: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> BackendResult<RequestBuilder> {
        Ok(self.client.request(method, self.url(segments)?))
    }

    /// 发送请求并把非 2xx 映射为 BackendError
    async fn execute(&self, builder: RequestBuilder, method: &Method, path: &str) -> BackendResult<Response> {
        debug!(%method, base_url = %self.base_url, path, "API Request");
        let start = Instant::now();
        let result = builder.send().await;
        perf::record_request(method.as_str(), path, start.elapsed());

        let response = match result {
            Ok(resp) => resp,
            Err(e) => {
                let err = BackendError::from(e);
                if err.is_connection() {
                    warn!(
                        base_url = %self.base_url,
                        "无法连接服务器: 请确认服务已启动、IP 地址正确、防火墙与 CORS 设置"
                    );
                }
                return Err(err);
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), path, "API Response");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body);
        warn!(status = status.as_u16(), path, message = %message, "API Response Error");
        Err(BackendError::from_status(status.as_u16(), message))
    }

    async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> BackendResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Decode(format!("{}: {}", what, e)))
    }

    async fn login_at(&self, segments: &[&str], credentials: &Credentials) -> BackendResult<LoginOutcome> {
        let path = segments.join("/");
        let builder = self.request(Method::POST, segments)?.json(credentials);
        let resp = self.execute(builder, &Method::POST, &path).await?;
        let raw: RawLoginResponse = Self::decode(resp, "登录响应").await?;

        match (raw.success, raw.token, raw.user) {
            (true, Some(token), Some(user)) => Ok(LoginOutcome {
                token,
                user: user.normalize(),
            }),
            (_, _, _) => Err(BackendError::Unauthorized(
                raw.message
                    .unwrap_or_else(|| "Invalid username or password".to_string()),
            )),
        }
    }

    async fn send_ack(&self, builder: RequestBuilder, method: Method, path: &str) -> BackendResult<()> {
        let resp = self.execute(builder, &method, path).await?;
        // 部分接口返回空体或非 JSON, 只要 2xx 即视为成功
        let body = resp.text().await.unwrap_or_default();
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) else {
            return Ok(());
        };
        // 只有显式 success=false 才视为失败
        if value.get("success") == Some(&serde_json::Value::Bool(false)) {
            let ack: RawAck = serde_json::from_value(value)
                .map_err(|e| BackendError::Decode(format!("{}: {}", path, e)))?;
            return Err(BackendError::Server {
                status: 200,
                message: ack.message().unwrap_or("Request failed").to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PlanningBackend for HttpBackend {
    async fn login(&self, credentials: &Credentials) -> BackendResult<LoginOutcome> {
        self.login_at(&["users", "login"], credentials).await
    }

    async fn admin_login(&self, credentials: &Credentials) -> BackendResult<LoginOutcome> {
        self.login_at(&["users", "admin", "login"], credentials).await
    }

    async fn verify_token(&self, token: &str) -> BackendResult<User> {
        let builder = self
            .request(Method::GET, &["users", "verify-token"])?
            .bearer_auth(token);
        let resp = self.execute(builder, &Method::GET, "users/verify-token").await?;
        let raw: RawUserResponse = Self::decode(resp, "令牌校验响应").await?;
        match (raw.success, raw.user) {
            (true, Some(user)) => Ok(user.normalize()),
            _ => Err(BackendError::Unauthorized(
                raw.message.unwrap_or_else(|| "令牌无效".to_string()),
            )),
        }
    }

    async fn check_username(&self, username: &str) -> BackendResult<bool> {
        let builder = self
            .request(Method::POST, &["users", "check-username"])?
            .json(&json!({ "username": username }));
        let resp = self.execute(builder, &Method::POST, "users/check-username").await?;
        let raw: RawExistsResponse = Self::decode(resp, "用户名校验响应").await?;
        Ok(raw.exists)
    }

    async fn reset_password(&self, token: &str, reset: &PasswordReset) -> BackendResult<()> {
        let builder = self
            .request(Method::POST, &["users", "admin", "reset-password"])?
            .bearer_auth(token)
            .json(reset);
        let resp = self
            .execute(builder, &Method::POST, "users/admin/reset-password")
            .await?;
        let ack: RawAck = Self::decode(resp, "重置密码响应").await?;
        if ack.success {
            Ok(())
        } else {
            Err(BackendError::Server {
                status: 200,
                message: ack
                    .message()
                    .unwrap_or("Failed to reset password")
                    .to_string(),
            })
        }
    }

    async fn create_user(&self, token: &str, user: &NewUser) -> BackendResult<()> {
        let builder = self
            .request(Method::POST, &["users", "admin", "create-user"])?
            .bearer_auth(token)
            .json(user);
        self.send_ack(builder, Method::POST, "users/admin/create-user")
            .await
    }

    async fn list_users(&self, token: &str) -> BackendResult<Vec<User>> {
        let builder = self.request(Method::GET, &["users"])?.bearer_auth(token);
        let resp = self.execute(builder, &Method::GET, "users").await?;
        let raw: RawUsersResponse = Self::decode(resp, "用户列表").await?;
        if !raw.success {
            return Ok(Vec::new());
        }
        Ok(raw.users.into_iter().map(|u| u.normalize()).collect())
    }

    async fn update_user(&self, token: &str, id: &str, update: &UserUpdate) -> BackendResult<User> {
        let path = format!("users/{}", id);
        let builder = self
            .request(Method::PUT, &["users", id])?
            .bearer_auth(token)
            .json(update);
        let resp = self.execute(builder, &Method::PUT, &path).await?;
        let raw: RawUserResponse = Self::decode(resp, "用户更新响应").await?;
        match (raw.success, raw.user) {
            (true, Some(user)) => Ok(user.normalize()),
            _ => Err(BackendError::Server {
                status: 200,
                message: raw
                    .message
                    .unwrap_or_else(|| "Failed to update user".to_string()),
            }),
        }
    }

    async fn delete_user(&self, token: &str, id: &str) -> BackendResult<()> {
        let path = format!("users/{}", id);
        let builder = self.request(Method::DELETE, &["users", id])?.bearer_auth(token);
        self.execute(builder, &Method::DELETE, &path).await?;
        Ok(())
    }

    async fn fetch_stock(&self) -> BackendResult<Vec<StockRow>> {
        let builder = self.request(Method::GET, &["rm"])?;
        let resp = self.execute(builder, &Method::GET, "rm").await?;
        let raw: Vec<RawStockRow> = Self::decode(resp, "库存列表").await?;
        Ok(raw.into_iter().map(RawStockRow::normalize).collect())
    }

    async fn update_stock(&self, adjustment: &StockAdjustment) -> BackendResult<()> {
        let builder = self.request(Method::POST, &["rm", "update"])?.json(adjustment);
        self.send_ack(builder, Method::POST, "rm/update").await
    }

    async fn upload_stock(&self, file_name: &str, bytes: Vec<u8>) -> BackendResult<()> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let builder = self.request(Method::POST, &["rm", "upload"])?.multipart(form);
        self.send_ack(builder, Method::POST, "rm/upload").await
    }

    async fn fetch_formulas(&self) -> BackendResult<Vec<FormulaLine>> {
        let builder = self.request(Method::GET, &["formula"])?;
        let resp = self.execute(builder, &Method::GET, "formula").await?;
        let raw: Vec<RawFormulaRow> = Self::decode(resp, "配方列表").await?;
        Ok(raw.into_iter().map(RawFormulaRow::normalize).collect())
    }

    async fn fetch_formula_details(&self, color_code: &str) -> BackendResult<Vec<FormulaLine>> {
        let path = format!("formula/details/{}", color_code);
        let builder = self.request(Method::GET, &["formula", "details", color_code])?;
        let resp = self.execute(builder, &Method::GET, &path).await?;
        let raw: Option<Vec<RawFormulaRow>> = Self::decode(resp, "配方明细").await?;
        let lines = raw.unwrap_or_default();
        if lines.is_empty() {
            return Err(BackendError::NotFound(format!(
                "No formula found for product code: {}",
                color_code
            )));
        }
        Ok(lines.into_iter().map(RawFormulaRow::normalize).collect())
    }

    async fn save_formula(&self, batch: &FormulaBatch) -> BackendResult<()> {
        let builder = self.request(Method::POST, &["formula", "batch"])?.json(batch);
        self.send_ack(builder, Method::POST, "formula/batch").await
    }

    async fn delete_formula(&self, color_code: &str, remark: &Remark) -> BackendResult<()> {
        let path = format!("formula/{}", color_code);
        let builder = self
            .request(Method::DELETE, &["formula", color_code])?
            .query(&[("remarks", remark.as_str())]);
        self.execute(builder, &Method::DELETE, &path).await?;
        Ok(())
    }

    async fn submit_plan(&self, submission: &PlanSubmission) -> BackendResult<()> {
        let builder = self.request(Method::POST, &["productplan"])?.json(submission);
        self.send_ack(builder, Method::POST, "productplan").await
    }

    async fn fetch_planning_records(&self) -> BackendResult<Vec<PlanningRecord>> {
        let builder = self.request(Method::GET, &["planningrecord"])?;
        let resp = self.execute(builder, &Method::GET, "planningrecord").await?;
        let raw: Vec<RawPlanningRecord> = Self::decode(resp, "计划记录").await?;
        Ok(raw.into_iter().map(RawPlanningRecord::normalize).collect())
    }

    async fn update_planning_record_lot(&self, id: &str, lot: f64) -> BackendResult<()> {
        let path = format!("planningrecord/{}", id);
        let builder = self
            .request(Method::PUT, &["planningrecord", id])?
            .json(&json!({ "lot": lot }));
        self.send_ack(builder, Method::PUT, &path).await
    }

    async fn delete_planning_record(&self, id: &str) -> BackendResult<()> {
        let path = format!("planningrecord/{}", id);
        let builder = self.request(Method::DELETE, &["planningrecord", id])?;
        self.execute(builder, &Method::DELETE, &path).await?;
        Ok(())
    }
}
