//! # LUCI Protocol
//!
//! 舵机链串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `numeric`: 角度范围与位置量化（纯函数）
//! - `servo`: 单个舵机的目标状态（带不变量）
//! - `command`: `SetServoPartial` 指令编码
//!
//! ## 指令格式
//!
//! ```text
//! LUCI_local 245 SetServoPartial:<ids>:<positions>:<velocities>
//! ```
//!
//! 指令为 ASCII 文本，换行符由写入端追加，编码器不负责。

pub mod command;
pub mod numeric;
pub mod servo;

// 重新导出常用类型
pub use command::*;
pub use numeric::*;
pub use servo::*;

use thiserror::Error;

/// 协议常量：设备族标识
pub const PROTOCOL_ID: &str = "LUCI_local";

/// 协议常量：目标主板地址
pub const TARGET: &str = "245";

/// 协议常量：部分舵机设置指令名
pub const COMMAND: &str = "SetServoPartial";

/// 中断控制字节（Ctrl+C），不带换行直接写出
pub const INTERRUPT_BYTE: u8 = 0x03;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid physical servo id: {0} (expected 1..=253)")]
    InvalidPhysicalId(u16),

    #[error("Invalid servo count: {0} (expected 1..=16)")]
    InvalidServoCount(usize),

    #[error("Unknown servo type: {0}")]
    UnknownServoType(String),

    #[error("Unknown angle mode: {0}")]
    UnknownAngleMode(String),

    #[error("Unknown command format: {0}")]
    UnknownCommandFormat(String),
}
