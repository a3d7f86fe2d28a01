//! 驱动层模块
//!
//! 本模块管理一个打开的舵机链连接，包括：
//! - 接收任务（按行读取设备输出写入会话日志）
//! - 互斥写入端（舵机指令、自由指令、中断字节）
//! - 有界会话日志（快照 / 清空 / 订阅）
//! - 可随时切换的指令格式
//!
//! # 使用场景
//!
//! 适用于直接发送舵机目标或自由指令的场景。
//! 序列回放请使用 `luci-client` 提供的更高级接口。

mod builder;
mod error;
pub mod log;
pub mod mode;
pub mod pipeline;
mod session;

pub use builder::{DEFAULT_BAUD_RATE, SessionBuilder, SessionConfig};
pub use error::DriverError;
pub use log::{LOG_CAPACITY, LogEntry, LogKind, SessionLog};
pub use mode::AtomicCommandFormat;
pub use pipeline::{RxExit, rx_loop};
pub use session::{
    BoxedWrite, DISCONNECTED_LOG_MESSAGE, FrameSink, INTERRUPT_LOG_MESSAGE, Session,
};
