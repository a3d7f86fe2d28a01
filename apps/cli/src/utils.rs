//! 命令共用的工具函数
//!
//! 连接参数、会话打开、日志输出和舵机目标解析

use anyhow::{Context, Result, bail};
use clap::Args;
use luci_driver::{LogEntry, LogKind, Session, SessionBuilder};
use luci_protocol::{CommandFormat, ServoKind, ServoState};

use crate::commands::config::CliConfig;

/// 连接参数（覆盖配置文件）
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectArgs {
    /// 串口（覆盖配置）
    #[arg(short, long)]
    pub port: Option<String>,

    /// 波特率（覆盖配置）
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// 指令格式（覆盖配置）
    #[arg(short, long)]
    pub format: Option<CommandFormat>,
}

impl ConnectArgs {
    /// 合并命令行参数与配置文件
    pub fn builder(&self, config: &CliConfig) -> Result<SessionBuilder> {
        let Some(port) = self.port.clone().or_else(|| config.port.clone()) else {
            bail!("❌ 未指定串口，请使用 --port 或 `luci-cli config set --port <PORT>`");
        };

        Ok(SessionBuilder::new()
            .port(port)
            .baud_rate(self.baud.unwrap_or(config.baud_rate))
            .format(self.format.unwrap_or(config.format)))
    }

    pub async fn open(&self, config: &CliConfig) -> Result<Session> {
        let builder = self.builder(config)?;
        let port = builder.config().port.clone().unwrap_or_default();
        builder.open().await.with_context(|| format!("打开串口 {} 失败", port))
    }
}

/// 打印一条会话日志
pub fn print_entry(entry: &LogEntry) {
    let tag = match entry.kind {
        LogKind::Rx => "RX",
        LogKind::Tx => "TX",
        LogKind::Info => "--",
        LogKind::Error => "!!",
    };
    println!("[{}] {}", tag, entry.message);
}

/// 解析舵机目标 `id:angle[:velocity]`
///
/// 未给出速度时使用 `default_velocity`。
pub fn parse_target(text: &str, kind: ServoKind, default_velocity: u16) -> Result<ServoState> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        bail!("舵机目标格式应为 id:angle[:velocity]，实际: {}", text);
    }

    let id: u8 = parts[0].parse().with_context(|| format!("无效的舵机 ID: {}", parts[0]))?;
    let angle: f64 = parts[1].parse().with_context(|| format!("无效的角度: {}", parts[1]))?;
    let velocity: u16 = match parts.get(2) {
        Some(v) => v.parse().with_context(|| format!("无效的速度: {}", v))?,
        None => default_velocity,
    };

    let servo = ServoState::new(id, kind)?.with_angle(angle).with_velocity(velocity);
    Ok(servo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        let servo = parse_target("3:150:100", ServoKind::Standard, 256).unwrap();
        assert_eq!(servo.physical_id(), 3);
        assert_eq!(servo.angle(), 150.0);
        assert_eq!(servo.velocity(), 100);

        let servo = parse_target("1:90", ServoKind::Extended, 256).unwrap();
        assert_eq!(servo.velocity(), 256);
        assert_eq!(servo.kind(), ServoKind::Extended);
    }

    #[test]
    fn test_parse_target_rejects_bad_input() {
        assert!(parse_target("1", ServoKind::Standard, 256).is_err());
        assert!(parse_target("a:90", ServoKind::Standard, 256).is_err());
        assert!(parse_target("1:90:1:2", ServoKind::Standard, 256).is_err());
        assert!(parse_target("0:90", ServoKind::Standard, 256).is_err());
    }

    #[test]
    fn test_connect_args_override_config() {
        let config = CliConfig {
            port: Some("COM3".to_string()),
            ..CliConfig::default()
        };
        let args = ConnectArgs {
            baud: Some(115_200),
            ..ConnectArgs::default()
        };

        let builder = args.builder(&config).unwrap();
        assert_eq!(builder.config().port.as_deref(), Some("COM3"));
        assert_eq!(builder.config().baud_rate, 115_200);

        assert!(ConnectArgs::default().builder(&CliConfig::default()).is_err());
    }
}
