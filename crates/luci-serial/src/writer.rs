//! 指令写入端
//!
//! 同一时刻只有一个写操作持有写入端。`CommandWriter` 可以廉价克隆，
//! 所有副本共享同一个互斥的写入端；关闭后所有写操作返回 [`SerialError::Closed`]。

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::SerialError;
use luci_protocol::INTERRUPT_BYTE;

/// 互斥的指令写入端
pub struct CommandWriter<W> {
    inner: Arc<Mutex<Option<W>>>,
}

impl<W> Clone for CommandWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: AsyncWrite + Unpin + Send> CommandWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(inner))),
        }
    }

    /// 写入一行文本指令（缺少换行时自动追加 `\n`）并刷新
    pub async fn write_line(&self, line: &str) -> Result<(), SerialError> {
        let mut guard = self.inner.lock().await;
        let writer = guard.as_mut().ok_or(SerialError::Closed)?;

        writer.write_all(line.as_bytes()).await?;
        if !line.ends_with('\n') {
            writer.write_all(b"\n").await?;
        }
        writer.flush().await?;

        trace!(line, "Wrote line");
        Ok(())
    }

    /// 写入单个中断字节（0x03，不带换行）
    pub async fn write_interrupt(&self) -> Result<(), SerialError> {
        let mut guard = self.inner.lock().await;
        let writer = guard.as_mut().ok_or(SerialError::Closed)?;

        writer.write_all(&[INTERRUPT_BYTE]).await?;
        writer.flush().await?;
        Ok(())
    }

    /// 按顺序写入多条指令，每条之后等待 `pacing`
    ///
    /// 每条指令单独获取写入端，间隔期间不持有锁，其他写操作可以穿插。
    /// 每条写入成功后调用 `on_written`。
    /// 取消令牌在任何一次等待中触发时立即返回 [`SerialError::Cancelled`]，
    /// 剩余指令不再发送。
    pub async fn write_paced<S, F>(
        &self,
        commands: &[S],
        pacing: Duration,
        cancel: &CancellationToken,
        mut on_written: F,
    ) -> Result<(), SerialError>
    where
        S: AsRef<str>,
        F: FnMut(&str),
    {
        for command in commands {
            if cancel.is_cancelled() {
                return Err(SerialError::Cancelled);
            }

            let command = command.as_ref();
            self.write_line(command).await?;
            on_written(command);

            tokio::select! {
                _ = cancel.cancelled() => return Err(SerialError::Cancelled),
                _ = tokio::time::sleep(pacing) => {},
            }
        }
        Ok(())
    }

    /// 释放写入端
    ///
    /// 关闭过程中的错误被忽略；重复调用无副作用。
    pub async fn close(&self) {
        let taken = self.inner.lock().await.take();
        if let Some(mut writer) = taken {
            if let Err(e) = writer.shutdown().await {
                debug!("Ignoring error while closing writer: {}", e);
            }
        }
    }

    /// 写入端是否已释放
    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.is_none()
    }
}
