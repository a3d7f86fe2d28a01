//! 接收管线
//!
//! 每个会话一个接收任务：从读端取出完整的行写入会话日志，直到被取消、
//! 流结束或读取出错。任何退出路径都会释放读端。

use std::sync::Arc;

use luci_serial::LineReader;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::log::SessionLog;

/// 接收任务的退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxExit {
    /// 会话关闭（主动取消）
    Cancelled,
    /// 对端关闭了流
    EndOfStream,
    /// 读取出错，已记录为 `Error` 日志
    ReadError,
}

/// RX 主循环
///
/// # 参数
/// - `reader`: 行读取器（读端的所有权随之转移，返回前释放）
/// - `cancel`: 会话取消令牌；取消时静默退出，不写错误日志
/// - `log`: 会话日志
pub async fn rx_loop<R: AsyncRead + Unpin>(
    mut reader: LineReader<R>,
    cancel: CancellationToken,
    log: Arc<SessionLog>,
) -> RxExit {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("RX loop cancelled");
                return RxExit::Cancelled;
            },
            next = reader.next_line() => next,
        };

        match next {
            Ok(Some(line)) => {
                log.rx(line);
            },
            Ok(None) => {
                debug!("RX stream ended");
                return RxExit::EndOfStream;
            },
            Err(e) => {
                // 关闭过程中的读错误不呈现给用户
                if cancel.is_cancelled() {
                    return RxExit::Cancelled;
                }
                warn!("RX loop stopped: {}", e);
                log.error(format!("Read Error: {e}"));
                return RxExit::ReadError;
            },
        }
    }
}
