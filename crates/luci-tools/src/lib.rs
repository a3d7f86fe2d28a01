//! # LUCI Tools - 动作序列数据结构与持久化
//!
//! **依赖原则**: 只依赖 `luci-protocol`，不依赖 `luci-driver` / `luci-client`
//!
//! ## 包含模块
//!
//! - `skill` - 帧与序列（纯数据结构）
//! - `catalog` - 序列目录、JSON 导入/导出
//! - `table` - 表格模式序列（JSON / CSV）
//! - `timestamp` - 时间戳处理（纯函数）

pub mod catalog;
pub mod skill;
pub mod table;
pub mod timestamp;

// 重新导出常用类型
pub use catalog::{CatalogError, NEW_SKILL_PREFIX, SkillCatalog};
pub use skill::{DEFAULT_FRAME_DURATION_MS, DEFAULT_FRAME_HOLD_MS, Frame, Skill, generate_id};
pub use table::{
    CSV_HEADER, TABLE_SERVO_COUNT, TableRow, parse_table_json, table_to_csv, table_to_skill,
};
pub use timestamp::{export_file_name, now_millis};
