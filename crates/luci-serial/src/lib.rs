//! # LUCI Serial Channel Layer
//!
//! 字节通道抽象层：把宿主平台提供的读/写字节流变成按行的文本记录和互斥的指令写入。
//!
//! - [`reader`]: 流式 UTF-8 解码 + `\r?\n` 分帧
//! - [`writer`]: 互斥写入（文本指令 / 中断字节 / 节流批量写入）
//! - [`port`]: 打开原生串口（`native-port` feature）
//!
//! 任何 `AsyncRead` / `AsyncWrite` 都可以作为通道，测试中使用 `tokio::io::duplex`。

pub mod reader;
pub mod writer;

#[cfg(feature = "native-port")]
pub mod port;

pub use reader::{LineDecoder, LineReader};
pub use writer::CommandWriter;

#[cfg(feature = "native-port")]
pub use port::{COMMON_BAUD_RATES, DEFAULT_BAUD_RATE, SerialConfig, list_ports, open_port};

use thiserror::Error;

/// 通道层统一错误类型
#[derive(Error, Debug)]
pub enum SerialError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open serial port {port}: {message}")]
    Open { port: String, message: String },

    /// 写入端已释放（会话已关闭）
    #[error("Channel closed")]
    Closed,

    /// 操作被取消（会话关闭或停止播放）
    #[error("Operation cancelled")]
    Cancelled,
}

impl SerialError {
    /// 是否由主动取消引起（这类错误不应呈现给用户）
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SerialError::Cancelled)
    }
}
