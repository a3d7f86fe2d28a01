//! 指令格式（原子版本）
//!
//! 会话的当前 [`CommandFormat`] 可以在任意时刻被宿主切换，
//! 正在进行的发送读取到的是切换前或切换后的值，不会读到中间状态。

use std::sync::atomic::{AtomicU8, Ordering};

use luci_protocol::CommandFormat;

/// 指令格式（原子版本，用于任务间共享）
///
/// # 示例
///
/// ```rust
/// use luci_driver::mode::AtomicCommandFormat;
/// use luci_protocol::CommandFormat;
/// use std::sync::atomic::Ordering;
///
/// let format = AtomicCommandFormat::new(CommandFormat::Batch);
/// format.set(CommandFormat::Separate, Ordering::Relaxed);
/// assert_eq!(format.get(Ordering::Relaxed), CommandFormat::Separate);
/// ```
#[derive(Debug)]
pub struct AtomicCommandFormat {
    inner: AtomicU8,
}

impl AtomicCommandFormat {
    pub fn new(format: CommandFormat) -> Self {
        Self {
            inner: AtomicU8::new(format.into()),
        }
    }

    /// 获取当前格式（无效值按 `Batch` 处理）
    pub fn get(&self, ordering: Ordering) -> CommandFormat {
        CommandFormat::try_from(self.inner.load(ordering)).unwrap_or_default()
    }

    pub fn set(&self, format: CommandFormat, ordering: Ordering) {
        self.inner.store(format.into(), ordering);
    }
}

impl Default for AtomicCommandFormat {
    fn default() -> Self {
        Self::new(CommandFormat::default())
    }
}

impl Clone for AtomicCommandFormat {
    fn clone(&self) -> Self {
        Self::new(self.get(Ordering::Relaxed))
    }
}
