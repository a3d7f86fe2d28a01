//! 原生串口
//!
//! 打开串口并拆分为独立的读/写两半。默认 8N1、无流控。

use tokio::io::{ReadHalf, WriteHalf};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, error, info, warn};

use crate::SerialError;

/// 默认波特率
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// 常用波特率（供选择界面使用）
pub const COMMON_BAUD_RATES: [u32; 7] = [9_600, 38_400, 57_600, 115_200, 230_400, 1_000_000, 2_000_000];

/// 串口配置
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// 设备路径，如 `/dev/ttyUSB0`、`COM3`
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub flow_control: FlowControl,
}

impl SerialConfig {
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
        }
    }
}

/// 打开串口，返回 (读端, 写端)
pub fn open_port(
    config: &SerialConfig,
) -> Result<(ReadHalf<SerialStream>, WriteHalf<SerialStream>), SerialError> {
    debug!(
        port = %config.port,
        baud_rate = config.baud_rate,
        data_bits = ?config.data_bits,
        stop_bits = ?config.stop_bits,
        parity = ?config.parity,
        flow_control = ?config.flow_control,
        "Opening serial port"
    );

    let mut stream = tokio_serial::new(&config.port, config.baud_rate)
        .data_bits(config.data_bits)
        .stop_bits(config.stop_bits)
        .parity(config.parity)
        .flow_control(config.flow_control)
        .open_native_async()
        .map_err(|e| {
            error!(port = %config.port, error = %e, "Failed to open serial port");
            SerialError::Open {
                port: config.port.clone(),
                message: e.to_string(),
            }
        })?;

    // 部分 USB 转串口板把 DTR 接到复位脚
    if let Err(e) = stream.write_data_terminal_ready(false) {
        warn!(port = %config.port, error = %e, "Failed to de-assert DTR");
    }
    if let Err(e) = stream.write_request_to_send(false) {
        warn!(port = %config.port, error = %e, "Failed to de-assert RTS");
    }

    info!(port = %config.port, baud_rate = config.baud_rate, "Serial port opened");
    Ok(tokio::io::split(stream))
}

/// 列出系统中可用的串口名
pub fn list_ports() -> Result<Vec<String>, SerialError> {
    let ports = tokio_serial::available_ports().map_err(|e| SerialError::Open {
        port: "*".to_string(),
        message: e.to_string(),
    })?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
