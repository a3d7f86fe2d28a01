//! send / raw / interrupt 命令
//!
//! 打开串口，发送一次，打印会话日志后断开

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use luci_driver::Session;
use luci_protocol::ServoKind;

use crate::commands::config::CliConfig;
use crate::utils::{ConnectArgs, parse_target, print_entry};

/// 发送后等待设备回应的时间（毫秒）
const DEFAULT_LISTEN_MS: u64 = 200;

/// 发送舵机目标
#[derive(Args, Debug)]
pub struct SendCommand {
    /// 舵机目标 `id:angle[:velocity]`，可以给多个
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// 舵机类型（覆盖配置）
    #[arg(short = 'k', long)]
    pub servo_kind: Option<ServoKind>,

    /// 逐个发送单舵机指令（忽略指令格式）
    #[arg(long)]
    pub single: bool,

    /// 发送后等待设备回应的时间（毫秒）
    #[arg(short, long, default_value_t = DEFAULT_LISTEN_MS)]
    pub listen: u64,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

impl SendCommand {
    pub async fn execute(&self) -> Result<()> {
        let config = CliConfig::load()?;
        let kind = self.servo_kind.unwrap_or(config.servo_kind);
        let servos = self
            .targets
            .iter()
            .map(|t| parse_target(t, kind, config.velocity))
            .collect::<Result<Vec<_>>>()?;

        let session = self.connect.open(&config).await?;
        let result = if self.single {
            send_each(&session, &servos).await
        } else {
            session.send_servos(&servos).await.map(|_| ()).map_err(Into::into)
        };

        finish(&session, self.listen).await;
        result
    }
}

async fn send_each(session: &Session, servos: &[luci_protocol::ServoState]) -> Result<()> {
    for servo in servos {
        session.send_single(servo).await?;
    }
    Ok(())
}

/// 发送自由指令
#[derive(Args, Debug)]
pub struct RawCommand {
    /// 指令文本（自动追加换行）
    pub text: String,

    /// 发送后等待设备回应的时间（毫秒）
    #[arg(short, long, default_value_t = DEFAULT_LISTEN_MS)]
    pub listen: u64,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

impl RawCommand {
    pub async fn execute(&self) -> Result<()> {
        let config = CliConfig::load()?;
        let session = self.connect.open(&config).await?;
        let result = session.send_raw(&self.text).await.map_err(Into::into);
        finish(&session, self.listen).await;
        result
    }
}

/// 发送中断字节（0x03）
#[derive(Args, Debug)]
pub struct InterruptCommand {
    /// 发送后等待设备回应的时间（毫秒）
    #[arg(short, long, default_value_t = DEFAULT_LISTEN_MS)]
    pub listen: u64,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

impl InterruptCommand {
    pub async fn execute(&self) -> Result<()> {
        let config = CliConfig::load()?;
        let session = self.connect.open(&config).await?;
        let result = session.interrupt().await.map_err(Into::into);
        finish(&session, self.listen).await;
        result
    }
}

/// 等待回应，断开并打印完整会话日志
async fn finish(session: &Session, listen_ms: u64) {
    tokio::time::sleep(Duration::from_millis(listen_ms)).await;
    session.close().await;
    for entry in session.log().snapshot() {
        print_entry(&entry);
    }
}
