//! 会话
//!
//! 一个已打开的连接：接收任务、互斥写入端、会话日志和当前指令格式。
//! 所有发送都经过同一个写入端，手动发送、单步和回放的字节不会交错。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use luci_protocol::{CommandFormat, ServoState, encode, encode_single};
use luci_serial::{CommandWriter, LineReader, SerialError};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::DriverError;
use crate::log::SessionLog;
use crate::mode::AtomicCommandFormat;
use crate::pipeline::{RxExit, rx_loop};

/// 写入端的类型擦除形式
pub type BoxedWrite = Box<dyn AsyncWrite + Unpin + Send>;

/// 中断字节发送后的日志文本
pub const INTERRUPT_LOG_MESSAGE: &str = "[Ctrl+C Interrupt Sent]";

/// 断开连接时的日志文本
pub const DISCONNECTED_LOG_MESSAGE: &str = "System: Serial Port Disconnected";

/// 帧发送端
///
/// 序列播放器通过它发送每一帧；[`Session`] 是默认实现，测试中可以替换为记录型实现。
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// 发送一帧中激活舵机的目标，返回实际写出的指令条数
    ///
    /// 一帧总是完整发送；只有关闭连接才会中断节流中的剩余指令。
    async fn send_frame(&self, servos: &[ServoState]) -> Result<usize, DriverError>;

    /// 当前是否可以发送
    fn is_connected(&self) -> bool;
}

/// 一个打开的串口会话
pub struct Session {
    writer: CommandWriter<BoxedWrite>,
    log: Arc<SessionLog>,
    format: AtomicCommandFormat,
    connected: AtomicBool,
    cancel: CancellationToken,
    rx_task: Mutex<Option<JoinHandle<RxExit>>>,
}

impl Session {
    /// 在给定的读/写两半上启动会话（必须在 tokio 运行时内调用）
    pub(crate) fn start<R, W>(reader: R, writer: W, format: CommandFormat, log: Arc<SessionLog>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let rx_task = tokio::spawn(rx_loop(LineReader::new(reader), cancel.clone(), log.clone()));

        Self {
            writer: CommandWriter::new(Box::new(writer) as BoxedWrite),
            log,
            format: AtomicCommandFormat::new(format),
            connected: AtomicBool::new(true),
            cancel,
            rx_task: Mutex::new(Some(rx_task)),
        }
    }

    pub fn log(&self) -> &Arc<SessionLog> {
        &self.log
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn format(&self) -> CommandFormat {
        self.format.get(Ordering::Relaxed)
    }

    pub fn set_format(&self, format: CommandFormat) {
        let old = self.format.get(Ordering::Relaxed);
        self.format.set(format, Ordering::Relaxed);
        if old != format {
            debug!(%old, new = %format, "Command format changed");
        }
    }

    /// 按当前格式发送舵机目标（未激活的舵机被跳过）
    ///
    /// 返回实际写出的指令条数；没有激活舵机时返回 0 且不写任何字节。
    /// `separate` 格式下相邻指令间隔 10ms，关闭会话会中断剩余指令。
    pub async fn send_servos(&self, servos: &[ServoState]) -> Result<usize, DriverError> {
        self.ensure_connected()?;

        let format = self.format();
        let commands = encode(servos, format);
        if commands.is_empty() {
            debug!("No active servos, nothing to send");
            return Ok(0);
        }

        let Some(pacing) = format.pacing() else {
            for command in &commands {
                self.write_logged(command).await?;
            }
            return Ok(commands.len());
        };

        let log = &self.log;
        let result = self
            .writer
            .write_paced(&commands, pacing, &self.cancel, |command| {
                log.tx(command);
            })
            .await;

        match result {
            Ok(()) => Ok(commands.len()),
            Err(e) => Err(self.report_write_error(e)),
        }
    }

    /// 单舵机寻址，总是使用单条 separate 形式，忽略全局格式
    pub async fn send_single(&self, servo: &ServoState) -> Result<(), DriverError> {
        self.ensure_connected()?;
        self.write_logged(&encode_single(servo)).await
    }

    /// 发送一条自由格式的文本指令（去除首尾空白，不能为空）
    pub async fn send_raw(&self, text: &str) -> Result<(), DriverError> {
        self.ensure_connected()?;
        let command = text.trim();
        if command.is_empty() {
            return Err(DriverError::InvalidInput("empty command".to_string()));
        }
        self.write_logged(command).await
    }

    /// 发送中断字节 0x03
    pub async fn interrupt(&self) -> Result<(), DriverError> {
        self.ensure_connected()?;
        match self.writer.write_interrupt().await {
            Ok(()) => {
                self.log.tx(INTERRUPT_LOG_MESSAGE);
                Ok(())
            },
            Err(e) => {
                self.log.error(format!("Interrupt Error: {e}"));
                Err(e.into())
            },
        }
    }

    /// 关闭会话
    ///
    /// 顺序：取消接收任务并等待其退出，然后释放写入端。过程中的错误被忽略。
    /// 重复调用无副作用。
    pub async fn close(&self) {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return;
        }

        self.cancel.cancel();

        let task = self.rx_task.lock().take();
        if let Some(task) = task {
            match task.await {
                Ok(exit) => debug!(?exit, "RX task finished"),
                Err(e) => warn!("RX task join failed: {}", e),
            }
        }

        self.writer.close().await;
        info!("Session closed");
        self.log.info(DISCONNECTED_LOG_MESSAGE);
    }

    async fn write_logged(&self, command: &str) -> Result<(), DriverError> {
        match self.writer.write_line(command).await {
            Ok(()) => {
                self.log.tx(command.trim());
                Ok(())
            },
            Err(e) => Err(self.report_write_error(e)),
        }
    }

    fn report_write_error(&self, e: SerialError) -> DriverError {
        if !e.is_cancellation() {
            self.log.error(format!("Write Error: {e}"));
        }
        e.into()
    }

    fn ensure_connected(&self) -> Result<(), DriverError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(DriverError::NotConnected)
        }
    }
}

#[async_trait]
impl FrameSink for Session {
    async fn send_frame(&self, servos: &[ServoState]) -> Result<usize, DriverError> {
        self.send_servos(servos).await
    }

    fn is_connected(&self) -> bool {
        Session::is_connected(self)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // 未显式关闭时至少停止接收任务
        self.cancel.cancel();
    }
}
