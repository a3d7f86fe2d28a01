//! 行读取器
//!
//! 把无界字节流还原为按换行分隔的文本记录。
//!
//! # 分层
//!
//! - [`LineDecoder`]: 纯状态机，不做 IO。流式 UTF-8 解码，多字节字符跨块时保留尾部字节；
//!   按 `\r?\n` 切分，最后一个不完整片段留在缓冲区。
//! - [`LineReader`]: 包装任意 `AsyncRead`，`next_line()` 惰性地产生去空白、非空的行。
//!
//! `next_line()` 是取消安全的：唯一的挂起点是底层 `read()`，
//! 状态只在读取完成后同步更新，可以放进 `tokio::select!` 与取消令牌竞争。

use std::collections::VecDeque;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

use crate::SerialError;

/// 单次读取的块大小
pub const READ_CHUNK_SIZE: usize = 256;

/// 流式行解码器
#[derive(Debug, Default)]
pub struct LineDecoder {
    /// 尚未组成完整 UTF-8 字符的尾部字节
    pending: Vec<u8>,

    /// 已解码、尚未遇到换行的文本
    buffer: String,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 输入一个字节块，返回其中所有完整的行（不含行尾 `\r\n` / `\n`）
    ///
    /// 空行也会返回，由调用方决定是否过滤。
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.decode(chunk);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };

        let rest = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);

        complete[..complete.len() - 1]
            .split('\n')
            .map(|segment| segment.strip_suffix('\r').unwrap_or(segment).to_string())
            .collect()
    }

    /// 当前未完成的行
    pub fn residual(&self) -> &str {
        &self.buffer
    }

    /// 是否还有未完成的数据（文本或半个字符）
    pub fn has_residual(&self) -> bool {
        !self.buffer.is_empty() || !self.pending.is_empty()
    }

    /// 清空所有状态
    pub fn reset(&mut self) {
        self.pending.clear();
        self.buffer.clear();
    }

    fn decode(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);

        let mut consumed = 0;
        while consumed < self.pending.len() {
            match std::str::from_utf8(&self.pending[consumed..]) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    consumed = self.pending.len();
                },
                Err(e) => {
                    let valid_end = consumed + e.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&self.pending[consumed..valid_end]) {
                        self.buffer.push_str(text);
                    }
                    consumed = valid_end;

                    match e.error_len() {
                        // 非法字节：替换为 U+FFFD 后继续
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            consumed += len;
                        },
                        // 不完整的多字节字符：留到下一个块
                        None => break,
                    }
                },
            }
        }

        self.pending.drain(..consumed);
    }
}

/// 异步行读取器
///
/// # 示例
///
/// ```rust,no_run
/// use luci_serial::LineReader;
///
/// # async fn example(port: tokio::io::DuplexStream) -> Result<(), luci_serial::SerialError> {
/// let mut reader = LineReader::new(port);
/// while let Some(line) = reader.next_line().await? {
///     println!("RX {line}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct LineReader<R> {
    inner: R,
    decoder: LineDecoder,
    ready: VecDeque<String>,
    chunk: Box<[u8]>,
    finished: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            decoder: LineDecoder::new(),
            ready: VecDeque::new(),
            chunk: vec![0u8; READ_CHUNK_SIZE].into_boxed_slice(),
            finished: false,
        }
    }

    /// 读取下一行（去除首尾空白，跳过空行）
    ///
    /// 流结束时返回 `Ok(None)`，未完成的尾部片段被丢弃。
    pub async fn next_line(&mut self) -> Result<Option<String>, SerialError> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Ok(Some(line));
            }
            if self.finished {
                return Ok(None);
            }

            let n = self.inner.read(&mut self.chunk).await?;
            if n == 0 {
                if self.decoder.has_residual() {
                    debug!(
                        residual = self.decoder.residual(),
                        "End of stream, discarding partial line"
                    );
                }
                self.finished = true;
                continue;
            }

            trace!(bytes = n, "Received chunk");
            for line in self.decoder.push(&self.chunk[..n]) {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    self.ready.push_back(trimmed.to_string());
                }
            }
        }
    }

    pub fn decoder(&self) -> &LineDecoder {
        &self.decoder
    }

    /// 取回底层读取端
    pub fn into_inner(self) -> R {
        self.inner
    }
}
