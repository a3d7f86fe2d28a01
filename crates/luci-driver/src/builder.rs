//! Builder 模式实现
//!
//! 提供链式构造 [`Session`] 的便捷方式。

use std::sync::Arc;

use luci_protocol::CommandFormat;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::info;

use crate::log::{LOG_CAPACITY, SessionLog};
use crate::session::Session;

#[cfg(feature = "native-port")]
use crate::error::DriverError;
#[cfg(feature = "native-port")]
use luci_serial::{SerialConfig, open_port};

/// 默认波特率
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// 会话配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// 串口设备路径（仅 `open()` 需要）
    pub port: Option<String>,
    pub baud_rate: u32,
    pub format: CommandFormat,
    /// 会话日志保留条数
    pub log_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            format: CommandFormat::default(),
            log_capacity: LOG_CAPACITY,
        }
    }
}

/// Session Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use luci_driver::SessionBuilder;
/// use luci_protocol::CommandFormat;
///
/// # async fn example() -> Result<(), luci_driver::DriverError> {
/// let session = SessionBuilder::new()
///     .port("/dev/ttyUSB0")
///     .baud_rate(115_200)
///     .format(CommandFormat::Interleaved)
///     .open()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: SessionConfig) -> Self {
        Self { config }
    }

    /// 设置串口设备路径
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.config.port = Some(port.into());
        self
    }

    /// 设置波特率（可选，默认 57600）
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.config.baud_rate = baud_rate;
        self
    }

    /// 设置初始指令格式（可选，默认 batch）
    pub fn format(mut self, format: CommandFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn log_capacity(mut self, capacity: usize) -> Self {
        self.config.log_capacity = capacity;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// 打开串口并启动会话
    #[cfg(feature = "native-port")]
    pub async fn open(self) -> Result<Session, DriverError> {
        let port = self
            .config
            .port
            .clone()
            .ok_or_else(|| DriverError::InvalidInput("serial port not specified".to_string()))?;

        let (reader, writer) = open_port(&SerialConfig::new(port, self.config.baud_rate))?;
        Ok(self.open_with(reader, writer))
    }

    /// 在任意读/写两半上启动会话（必须在 tokio 运行时内调用）
    ///
    /// 测试中配合 `tokio::io::duplex` 使用。
    pub fn open_with<R, W>(self, reader: R, writer: W) -> Session
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let log = Arc::new(SessionLog::with_capacity(self.config.log_capacity));
        let session = Session::start(reader, writer, self.config.format, log);

        info!(
            port = self.config.port.as_deref().unwrap_or("<stream>"),
            baud_rate = self.config.baud_rate,
            format = %self.config.format,
            "Session opened"
        );
        session
            .log()
            .info(format!("System: Connected at {} baud", self.config.baud_rate));
        session
    }
}
