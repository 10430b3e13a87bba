// ==========================================
// 配方库存核对系统 - 请求序号
// ==========================================
// 职责: 同一资源并发刷新时只采纳最后发出的请求结果
// 规则: 每个资源一个 Latest, 序号单调递增; 过期响应丢弃并记 debug 日志
// ==========================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::debug;

/// 一次请求的凭据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    pub resource: String,
    pub seq: u64,
}

// ==========================================
// Latest<T> - 单个资源的最新值
// ==========================================
#[derive(Debug)]
pub struct Latest<T> {
    resource: &'static str,
    issued: AtomicU64,
    applied: RwLock<Option<(u64, T)>>,
}

impl<T: Clone> Latest<T> {
    pub fn new(resource: &'static str) -> Self {
        Self {
            resource,
            issued: AtomicU64::new(0),
            applied: RwLock::new(None),
        }
    }

    /// 发出请求前调用
    pub fn begin(&self) -> RequestTicket {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        RequestTicket {
            resource: self.resource.to_string(),
            seq,
        }
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.seq
    }

    /// 仅当 ticket 是最新发出的请求时采纳; 返回是否采纳
    pub fn apply(&self, ticket: &RequestTicket, value: T) -> bool {
        if !self.is_current(ticket) {
            debug!(resource = self.resource, seq = ticket.seq, "丢弃过期响应");
            return false;
        }
        let mut guard = match self.applied.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // 写锁内再比较一次, 防止更新的结果已先写入
        if guard.as_ref().map_or(false, |(seq, _)| *seq > ticket.seq) {
            return false;
        }
        *guard = Some((ticket.seq, value));
        true
    }

    pub fn get(&self) -> Option<T> {
        let guard = match self.applied.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.as_ref().map(|(_, v)| v.clone())
    }
}
