//! 客户端接口模块
//!
//! 本模块提供 LUCI 舵机链的上位机接口，包括：
//! - 序列播放器（按帧时间顺序发送，支持暂停 / 恢复 / 停止 / 单步）
//! - 工作台（会话 + 舵机链 + 序列目录 + 播放器）
//!
//! # 使用场景
//!
//! 这是大多数用户应该使用的模块。
//! 如果只需要发送单条指令，可以直接使用 `luci-driver` 的 [`Session`]。

mod error;
pub mod sequencer;
pub mod state;
pub mod workbench;

// 重新导出常用类型
pub use error::ClientError;
pub use luci_driver::{Session, SessionBuilder};
pub use sequencer::{MAX_SPEED, MIN_SPEED, PAUSE_POLL_INTERVAL, Sequencer, validate_speed};
pub use state::{AtomicPlaybackState, PlayMode, PlaybackState, StepDirection};
pub use workbench::{DEFAULT_SPEED, Workbench};
