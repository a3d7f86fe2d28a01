//! 配置管理命令
//!
//! 用于管理 CLI 配置（串口、波特率、指令格式等）

use anyhow::{Context, Result};
use clap::Subcommand;
use luci_driver::DEFAULT_BAUD_RATE;
use luci_protocol::{CommandFormat, DEFAULT_VELOCITY, ServoKind};
use std::fs;
use std::path::{Path, PathBuf};

/// 配置文件路径
fn config_dir() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;

    path.push("luci");
    Ok(path)
}

fn config_file() -> Result<PathBuf> {
    let mut path = config_dir()?;
    fs::create_dir_all(&path).context("创建配置目录失败")?;

    path.push("config.toml");
    Ok(path)
}

/// CLI 配置
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// 默认串口
    pub port: Option<String>,

    /// 波特率
    pub baud_rate: u32,

    /// 指令格式
    pub format: CommandFormat,

    /// 新建舵机的类型
    pub servo_kind: ServoKind,

    /// 新建舵机的默认速度
    pub velocity: u16,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            format: CommandFormat::default(),
            servo_kind: ServoKind::default(),
            velocity: DEFAULT_VELOCITY,
        }
    }
}

impl CliConfig {
    /// 加载配置（文件不存在时返回默认配置）
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("读取配置文件失败")?;
        toml::from_str(&content).context("解析配置文件失败")
    }

    /// 保存配置
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("序列化配置失败")?;
        fs::write(path, format!("# LUCI CLI Configuration\n\n{content}"))
            .context("写入配置文件失败")?;
        Ok(())
    }

    fn print(&self) {
        println!("  串口: {}", self.port.as_deref().unwrap_or("(未设置)"));
        println!("  波特率: {}", self.baud_rate);
        println!("  指令格式: {}", self.format);
        println!("  舵机类型: {}", self.servo_kind);
        println!("  默认速度: {}", self.velocity);
    }
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 设置配置项
    Set {
        /// 串口名称（如 /dev/ttyUSB0, COM3）
        #[arg(short, long)]
        port: Option<String>,

        /// 波特率
        #[arg(short, long)]
        baud: Option<u32>,

        /// 指令格式（batch / interleaved / separate）
        #[arg(short, long)]
        format: Option<CommandFormat>,

        /// 舵机类型（AX-12A / MX-64 …）
        #[arg(short = 'k', long)]
        servo_kind: Option<ServoKind>,

        /// 默认速度（0-1023）
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(0..=1023))]
        velocity: Option<u16>,
    },

    /// 获取配置项
    Get {
        /// 配置项名称
        #[arg(default_value = "all")]
        key: String,
    },

    /// 检查配置
    Check,
}

impl ConfigCommand {
    pub async fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Set {
                port,
                baud,
                format,
                servo_kind,
                velocity,
            } => Self::set_(port, baud, format, servo_kind, velocity),

            ConfigCommand::Get { key } => Self::get_(&key),

            ConfigCommand::Check => Self::check_(),
        }
    }

    fn set_(
        port: Option<String>,
        baud: Option<u32>,
        format: Option<CommandFormat>,
        servo_kind: Option<ServoKind>,
        velocity: Option<u16>,
    ) -> Result<()> {
        let mut config = CliConfig::load()?;

        if let Some(port) = port {
            println!("✅ 设置默认串口: {}", port);
            config.port = Some(port);
        }

        if let Some(baud) = baud {
            config.baud_rate = baud;
            println!("✅ 设置波特率: {}", baud);
        }

        if let Some(format) = format {
            config.format = format;
            println!("✅ 设置指令格式: {}", format);
        }

        if let Some(kind) = servo_kind {
            config.servo_kind = kind;
            println!("✅ 设置舵机类型: {}", kind);
        }

        if let Some(velocity) = velocity {
            config.velocity = velocity;
            println!("✅ 设置默认速度: {}", velocity);
        }

        config.save()
    }

    fn get_(key: &str) -> Result<()> {
        let config = CliConfig::load()?;

        match key {
            "port" => println!("{}", config.port.as_deref().unwrap_or("(未设置)")),
            "baud" | "baud_rate" => println!("{}", config.baud_rate),
            "format" => println!("{}", config.format),
            "servo_kind" => println!("{}", config.servo_kind),
            "velocity" => println!("{}", config.velocity),
            _ => {
                println!("LUCI CLI 配置:");
                config.print();
            },
        }

        Ok(())
    }

    fn check_() -> Result<()> {
        let path = config_file()?;
        let config = CliConfig::load_from(&path)?;

        println!("配置文件: {}", path.display());
        config.print();

        if config.port.is_none() {
            println!("⚠️  未设置默认串口，请使用 `luci-cli config set --port <PORT>`");
        }
        if !luci_serial::COMMON_BAUD_RATES.contains(&config.baud_rate) {
            println!("⚠️  非常用波特率: {}", config.baud_rate);
        }

        Ok(())
    }
}
