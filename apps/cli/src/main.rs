//! # LUCI CLI
//!
//! Command-line interface for LUCI servo chains.
//!
//! ## One-shot 命令
//!
//! ```bash
//! # 配置默认串口
//! luci-cli config set --port /dev/ttyUSB0 --baud 57600
//!
//! # 发送舵机目标（内部：连接 -> 发送 -> 断开）
//! luci-cli send 1:150:256 2:90
//!
//! # 回放导出的序列
//! luci-cli play --input luci_skills_2026-10-17.json --speed 1.5
//! ```
//!
//! ## 串口终端
//!
//! ```bash
//! $ luci-cli monitor
//! [--] System: Connected at 57600 baud
//! LUCI_local 245 SetServoPartial:0:613:256
//! [TX] LUCI_local 245 SetServoPartial:0:613:256
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod utils;

use commands::{
    ConfigCommand, InterruptCommand, MonitorCommand, PlayCommand, RawCommand, SendCommand,
    TableCommand, list_ports,
};

/// LUCI CLI - 舵机链命令行工具
#[derive(Parser, Debug)]
#[command(name = "luci-cli")]
#[command(about = "Command-line interface for LUCI servo chains", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 列出可用串口
    Ports,

    /// 发送舵机目标
    Send {
        #[command(flatten)]
        args: SendCommand,
    },

    /// 发送自由指令
    Raw {
        #[command(flatten)]
        args: RawCommand,
    },

    /// 发送中断字节（Ctrl+C）
    Interrupt {
        #[command(flatten)]
        args: InterruptCommand,
    },

    /// 串口终端
    Monitor {
        #[command(flatten)]
        args: MonitorCommand,
    },

    /// 回放序列
    Play {
        #[command(flatten)]
        args: PlayCommand,
    },

    /// 表格模式转换
    Table {
        #[command(flatten)]
        args: TableCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("luci_cli=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute().await,
        Commands::Ports => list_ports(),
        Commands::Send { args } => args.execute().await,
        Commands::Raw { args } => args.execute().await,
        Commands::Interrupt { args } => args.execute().await,
        Commands::Monitor { args } => args.execute().await,
        Commands::Play { args } => args.execute().await,
        Commands::Table { args } => args.execute().await,
    }
}
