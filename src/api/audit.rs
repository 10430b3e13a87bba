// ==========================================
// 配方库存核对系统 - 操作日志写入
// ==========================================
// 远端写操作已成功后才记录; 本地写日志失败只告警, 不回滚远端结果
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::repository::action_log_repo::ActionLogRepository;
use tracing::warn;

pub(crate) fn record(repo: &ActionLogRepository, log: ActionLog) {
    if let Err(e) = repo.insert(&log) {
        warn!(
            action_type = %log.action_type,
            actor = %log.actor,
            error = %e,
            "操作日志写入失败"
        );
    }
}
