// ==========================================
// 配方库存核对系统 - 会话仓储
// ==========================================
// 对齐: db.rs client_session 表（单行, slot=1）
// 用途: CLI 多次调用之间保留登录令牌
// ==========================================

use crate::app::session::SessionStore;
use crate::domain::user::{Session, User};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SessionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SessionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl SessionStore for SessionRepository {
    fn load(&self) -> RepositoryResult<Option<Session>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                "SELECT token, user_json, is_admin, logged_in_at FROM client_session WHERE slot = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((token, user_json, is_admin, ts)) = row else {
            return Ok(None);
        };
        let user: User = serde_json::from_str(&user_json)?;
        let logged_in_at = NaiveDateTime::parse_from_str(&ts, TS_FORMAT).map_err(|e| {
            RepositoryError::FieldValueError {
                field: "logged_in_at".to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(Some(Session {
            token,
            user,
            is_admin: is_admin != 0,
            logged_in_at,
        }))
    }

    fn save(&self, session: &Session) -> RepositoryResult<()> {
        let user_json = serde_json::to_string(&session.user)?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO client_session (slot, token, user_json, is_admin, logged_in_at)
            VALUES (1, ?1, ?2, ?3, ?4)
            ON CONFLICT(slot) DO UPDATE SET
                token = excluded.token,
                user_json = excluded.user_json,
                is_admin = excluded.is_admin,
                logged_in_at = excluded.logged_in_at
            "#,
            params![
                session.token,
                user_json,
                session.is_admin as i64,
                session.logged_in_at.format(TS_FORMAT).to_string(),
            ],
        )?;
        Ok(())
    }

    fn clear(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute("DELETE FROM client_session", [])?;
        Ok(())
    }
}
