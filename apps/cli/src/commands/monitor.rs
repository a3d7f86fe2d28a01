//! monitor 命令
//!
//! 串口终端：实时打印设备输出，标准输入的每一行作为自由指令发送。
//! 输入 `!int` 发送中断字节，Ctrl-C 或输入结束时断开。

use anyhow::Result;
use clap::Args;
use luci_driver::DriverError;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::commands::config::CliConfig;
use crate::utils::{ConnectArgs, print_entry};

/// 发送中断字节的输入
const INTERRUPT_INPUT: &str = "!int";

#[derive(Args, Debug)]
pub struct MonitorCommand {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

impl MonitorCommand {
    pub async fn execute(&self) -> Result<()> {
        let config = CliConfig::load()?;
        let session = self.connect.open(&config).await?;
        let mut entries = session.log().subscribe();

        for entry in session.log().snapshot() {
            print_entry(&entry);
        }
        println!("💡 输入指令后回车发送，`{}` 发送中断，Ctrl-C 退出", INTERRUPT_INPUT);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,

                entry = entries.recv() => match entry {
                    Ok(entry) => print_entry(&entry),
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "Log output lagged"),
                    Err(RecvError::Closed) => break,
                },

                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let sent = if line == INTERRUPT_INPUT {
                        session.interrupt().await
                    } else {
                        session.send_raw(line).await
                    };
                    if let Err(e) = sent {
                        if let Some(message) = failure_message(&e) {
                            eprintln!("{}", message);
                        }
                    }
                },
            }

            if !session.is_connected() {
                break;
            }
        }

        session.close().await;
        while let Ok(entry) = entries.try_recv() {
            print_entry(&entry);
        }
        Ok(())
    }
}

/// 需要单独提示的发送失败
///
/// 串口读写错误已经写入会话日志并随订阅打印；取消不提示。
fn failure_message(error: &DriverError) -> Option<String> {
    match error {
        DriverError::Serial(_) => None,
        e => Some(format!("❌ {}", e)),
    }
}
