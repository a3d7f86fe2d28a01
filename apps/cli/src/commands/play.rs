//! play 命令
//!
//! 从导出的序列文件回放一个序列

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use luci_client::{MAX_SPEED, MIN_SPEED, PlayMode, Workbench};
use luci_tools::SkillCatalog;

use crate::commands::config::CliConfig;
use crate::utils::ConnectArgs;

/// 回放命令参数
#[derive(Args, Debug)]
pub struct PlayCommand {
    /// 序列文件（JSON 导出格式）
    #[arg(short, long)]
    pub input: PathBuf,

    /// 序列名称（默认为文件中的第一个序列）
    #[arg(short, long)]
    pub skill: Option<String>,

    /// 播放范围（all / from-selected / selected-only）
    #[arg(short, long, default_value = "all")]
    pub mode: PlayMode,

    /// 选中帧下标（0 基，用于 from-selected / selected-only）
    #[arg(long)]
    pub frame: Option<usize>,

    /// 回放速度倍数（0.1 ~ 5.0）
    #[arg(long, default_value_t = 1.0)]
    pub speed: f64,

    /// 循环播放（覆盖文件中的设置）
    #[arg(long = "loop")]
    pub looping: Option<bool>,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

impl PlayCommand {
    pub async fn execute(&self) -> Result<()> {
        if !(MIN_SPEED..=MAX_SPEED).contains(&self.speed) {
            bail!(
                "❌ 速度倍数超出范围: {:.2}（允许 {} ~ {}）",
                self.speed,
                MIN_SPEED,
                MAX_SPEED
            );
        }

        let mut catalog = SkillCatalog::load(&self.input)?;
        if let Some(name) = &self.skill {
            let id = catalog
                .find_by_name(name)
                .map(|s| s.id.clone())
                .with_context(|| format!("序列不存在: {}", name))?;
            catalog.activate(&id)?;
        }
        let Some(skill) = catalog.active() else {
            bail!("❌ 序列文件为空: {}", self.input.display());
        };
        let total = skill.len();
        println!("📁 序列: {}（{} 帧，{:.1}s）", skill.name, total, skill.total_duration().as_secs_f64());

        let config = CliConfig::load()?;
        let session = self.connect.open(&config).await?;
        let mut workbench = Workbench::new(session, Vec::new()).with_catalog(catalog);

        if let Some(looping) = self.looping {
            workbench.set_looping(looping)?;
        }
        workbench.set_speed(self.speed)?;
        workbench.set_mode(self.mode);
        workbench.select(self.frame);

        let mut playhead = workbench.subscribe_playhead();
        if !workbench.play()? {
            workbench.disconnect().await;
            bail!("❌ 无法开始回放");
        }
        println!("▶ 开始回放（{}，{:.2}x），Ctrl-C 停止", self.mode, self.speed);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    workbench.stop();
                    println!("⏹ 已停止");
                    break;
                },

                changed = playhead.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    match *playhead.borrow_and_update() {
                        Some(index) => println!("  帧 {}/{}", index + 1, total),
                        None => {
                            println!("✅ 回放完成");
                            break;
                        },
                    }
                },
            }
        }

        workbench.disconnect().await;
        Ok(())
    }
}
