//! 客户端错误类型

use luci_driver::DriverError;
use luci_protocol::ProtocolError;
use luci_tools::CatalogError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 播放速度超出 `[0.1, 5.0]`
    #[error("Invalid playback speed: {0} (expected 0.1..=5.0)")]
    InvalidSpeed(f64),

    /// 播放或暂停中不允许修改
    #[error("Playback is active")]
    PlaybackActive,

    #[error("No active skill")]
    NoActiveSkill,

    #[error("Servo index out of range: {0}")]
    ServoIndex(usize),
}
