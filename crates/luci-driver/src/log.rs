//! 会话日志
//!
//! 追加写入的有界环形日志，只保留最近 [`LOG_CAPACITY`] 条。
//! 每条日志同时广播给订阅者，并镜像到 `tracing`。

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

/// 默认保留条数
pub const LOG_CAPACITY: usize = 2000;

/// 广播通道容量（慢订阅者会收到 `Lagged`）
const BROADCAST_CAPACITY: usize = 256;

/// 日志类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum LogKind {
    /// 设备发来的行
    Rx,
    /// 已发送的指令
    Tx,
    Info,
    Error,
}

/// 一条日志
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogEntry {
    /// 会话内单调递增
    pub id: u64,
    /// Unix 时间戳（毫秒）
    pub timestamp_ms: u64,
    pub kind: LogKind,
    pub message: String,
}

/// 有界会话日志
#[derive(Debug)]
pub struct SessionLog {
    ring: Mutex<Ring>,
    capacity: usize,
    sender: broadcast::Sender<LogEntry>,
}

/// id 分配与入队在同一把锁内完成，保留的日志按 id 严格递增
#[derive(Debug)]
struct Ring {
    entries: VecDeque<LogEntry>,
    next_id: u64,
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLog {
    pub fn new() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }

    /// 指定保留条数（至少 1 条）
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            ring: Mutex::new(Ring {
                entries: VecDeque::with_capacity(capacity.min(LOG_CAPACITY)),
                next_id: 0,
            }),
            capacity,
            sender,
        }
    }

    /// 追加一条日志，返回其 id
    pub fn push(&self, kind: LogKind, message: impl Into<String>) -> u64 {
        let message = message.into();
        match kind {
            LogKind::Rx => debug!(kind = "rx", "{}", message),
            LogKind::Tx => debug!(kind = "tx", "{}", message),
            LogKind::Info => info!("{}", message),
            LogKind::Error => error!("{}", message),
        }

        let mut ring = self.ring.lock();
        let entry = LogEntry {
            id: ring.next_id,
            timestamp_ms: now_millis(),
            kind,
            message,
        };
        ring.next_id += 1;
        if ring.entries.len() == self.capacity {
            ring.entries.pop_front();
        }
        ring.entries.push_back(entry.clone());

        let id = entry.id;
        // 广播也在锁内，订阅者收到的顺序与 id 一致；没有订阅者时发送失败，忽略
        let _ = self.sender.send(entry);
        id
    }

    pub fn rx(&self, message: impl Into<String>) -> u64 {
        self.push(LogKind::Rx, message)
    }

    pub fn tx(&self, message: impl Into<String>) -> u64 {
        self.push(LogKind::Tx, message)
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.push(LogKind::Info, message)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.push(LogKind::Error, message)
    }

    /// 当前保留的全部日志（按时间顺序）
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.ring.lock().entries.iter().cloned().collect()
    }

    /// 清空保留的日志（id 继续递增）
    pub fn clear(&self) {
        self.ring.lock().entries.clear();
    }

    /// 订阅之后追加的日志
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }

    pub fn len(&self) -> usize {
        self.ring.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
