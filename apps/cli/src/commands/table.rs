//! table 命令
//!
//! 把表格模式的 JSON 转换为序列文件或 CSV

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use luci_protocol::{ServoKind, incremental_roster};
use luci_tools::{
    SkillCatalog, TABLE_SERVO_COUNT, export_file_name, now_millis, parse_table_json,
    table_to_csv, table_to_skill,
};

use crate::commands::config::CliConfig;

#[derive(Args, Debug)]
pub struct TableCommand {
    /// 表格 JSON 文件
    #[arg(short, long)]
    pub input: PathBuf,

    /// 输出文件（默认按日期生成文件名）
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 导出为 CSV 而不是序列文件
    #[arg(long)]
    pub csv: bool,

    /// 舵机类型（覆盖配置）
    #[arg(short = 'k', long)]
    pub servo_kind: Option<ServoKind>,
}

impl TableCommand {
    pub async fn execute(&self) -> Result<()> {
        let text = fs::read_to_string(&self.input)
            .with_context(|| format!("读取表格文件失败: {}", self.input.display()))?;
        let rows = parse_table_json(&text)?;

        let name = self
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "table".to_string());

        let output = if self.csv {
            let output = self.output_path("table_mode", "csv");
            fs::write(&output, table_to_csv(&rows))
                .with_context(|| format!("写入 CSV 失败: {}", output.display()))?;
            output
        } else {
            let config = CliConfig::load()?;
            let kind = self.servo_kind.unwrap_or(config.servo_kind);
            let template = incremental_roster(TABLE_SERVO_COUNT, kind)?;

            let mut catalog = SkillCatalog::new();
            catalog.add_skill(table_to_skill(&rows, &template, name)?);
            let output = self.output_path("luci_skills", "json");
            catalog.save(&output)?;
            output
        };

        println!("✅ {} 行 → {}", rows.len(), output.display());
        Ok(())
    }

    fn output_path(&self, prefix: &str, extension: &str) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(export_file_name(prefix, now_millis(), extension)))
    }
}
