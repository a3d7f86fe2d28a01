//! 驱动层错误类型定义

use luci_protocol::ProtocolError;
use luci_serial::SerialError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口通道错误
    #[error("Serial error: {0}")]
    Serial(#[from] SerialError),

    /// 协议错误（如非法的舵机地址）
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 会话未连接或已关闭
    #[error("Not connected")]
    NotConnected,

    /// 无效输入（如空指令）
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DriverError {
    /// 是否由主动取消引起
    pub fn is_cancellation(&self) -> bool {
        matches!(self, DriverError::Serial(e) if e.is_cancellation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::Serial(SerialError::Closed);
        assert_eq!(err.to_string(), "Serial error: Channel closed");

        let err = DriverError::Protocol(ProtocolError::InvalidPhysicalId(0));
        assert!(err.to_string().starts_with("Protocol error:"));

        assert_eq!(DriverError::NotConnected.to_string(), "Not connected");
        assert_eq!(
            DriverError::InvalidInput("empty command".to_string()).to_string(),
            "Invalid input: empty command"
        );
    }

    #[test]
    fn test_cancellation_detection() {
        assert!(DriverError::Serial(SerialError::Cancelled).is_cancellation());
        assert!(!DriverError::Serial(SerialError::Closed).is_cancellation());
        assert!(!DriverError::NotConnected.is_cancellation());
    }
}
