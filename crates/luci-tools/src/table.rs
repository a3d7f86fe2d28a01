//! 表格模式序列
//!
//! 固定布局的表格：每行一帧，包含速度、延时和 8 个角度（Base + Servo1..7）。
//!
//! | 列 | 含义 |
//! |----|------|
//! | `frame` | 行号（导入时重新从 1 编号） |
//! | `speed` | 速度系数，舵机速度 = `round(speed * 128)` |
//! | `delay` | 到下一帧前的等待（秒），最后一帧不等待 |
//! | `base` | 舵机链第 0 个舵机的角度 |
//! | `servo1`..`servo7` | 第 1..7 个舵机的角度 |

use std::fmt::Write as _;

use luci_protocol::{MAX_VELOCITY, ServoKind, ServoState};
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogError;
use crate::skill::{Frame, Skill};

/// 表格映射的舵机数（Base + Servo1..7）
pub const TABLE_SERVO_COUNT: usize = 8;

/// 速度系数到舵机速度的换算
pub const VELOCITY_PER_SPEED: f64 = 128.0;

/// CSV 表头
pub const CSV_HEADER: &str =
    "Frame,Speed,Delay,Base (P),Servo1,Servo2,Servo3,Servo4,Servo5,Servo6,Servo7";

/// 模板中缺少的舵机使用的角度
const FILL_ANGLE: f64 = 180.0;

/// 表格的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub frame: u32,
    pub speed: f64,
    /// 秒
    pub delay: f64,
    pub base: f64,
    pub servo1: f64,
    pub servo2: f64,
    pub servo3: f64,
    pub servo4: f64,
    pub servo5: f64,
    pub servo6: f64,
    pub servo7: f64,
}

impl TableRow {
    /// 默认行：速度 2.0，延时 1 秒，所有角度 180°
    pub fn new(frame: u32) -> Self {
        Self {
            frame,
            speed: 2.0,
            delay: 1.0,
            base: FILL_ANGLE,
            servo1: FILL_ANGLE,
            servo2: FILL_ANGLE,
            servo3: FILL_ANGLE,
            servo4: FILL_ANGLE,
            servo5: FILL_ANGLE,
            servo6: FILL_ANGLE,
            servo7: FILL_ANGLE,
        }
    }

    /// 按舵机链顺序排列的 8 个角度
    pub fn angles(&self) -> [f64; TABLE_SERVO_COUNT] {
        [
            self.base,
            self.servo1,
            self.servo2,
            self.servo3,
            self.servo4,
            self.servo5,
            self.servo6,
            self.servo7,
        ]
    }

    /// 舵机速度（钳位到 `[0, 1023]`）
    pub fn velocity(&self) -> u16 {
        let velocity = (self.speed * VELOCITY_PER_SPEED).round();
        if velocity.is_nan() {
            return 0;
        }
        velocity.clamp(0.0, f64::from(MAX_VELOCITY)) as u16
    }

    /// 延时（毫秒）
    pub fn delay_ms(&self) -> u32 {
        let ms = (self.delay * 1000.0).round();
        if ms.is_nan() || ms <= 0.0 {
            0
        } else {
            ms.min(f64::from(u32::MAX)) as u32
        }
    }

    /// 映射为舵机目标
    ///
    /// 第 0..8 个槽位取模板中的舵机（缺少时按物理 ID `slot + 1` 新建，类型与模板第一个相同），
    /// 设置角度和速度并激活；模板中多出的舵机原样保留。
    pub fn to_servos(&self, template: &[ServoState]) -> Result<Vec<ServoState>, CatalogError> {
        let kind = template.first().map(ServoState::kind).unwrap_or(ServoKind::Standard);
        let velocity = self.velocity();

        let mut servos = Vec::with_capacity(template.len().max(TABLE_SERVO_COUNT));
        for (slot, angle) in self.angles().into_iter().enumerate() {
            let mut servo = match template.get(slot) {
                Some(existing) => existing.clone(),
                None => ServoState::new(slot as u8 + 1, kind)?.with_angle(FILL_ANGLE),
            };
            servo.set_angle(angle);
            servo.set_velocity(velocity);
            servo.set_active(true);
            servos.push(servo);
        }
        servos.extend(template.iter().skip(TABLE_SERVO_COUNT).cloned());

        Ok(servos)
    }
}

/// 重新从 1 编号
pub fn renumber(rows: &mut [TableRow]) {
    for (index, row) in rows.iter_mut().enumerate() {
        row.frame = index as u32 + 1;
    }
}

/// 解析表格 JSON
///
/// 必须是非空数组，且每行都包含全部字段；通过后重新编号。
pub fn parse_table_json(text: &str) -> Result<Vec<TableRow>, CatalogError> {
    let mut rows: Vec<TableRow> = serde_json::from_str(text)
        .map_err(|e| CatalogError::InvalidTable(e.to_string()))?;
    if rows.is_empty() {
        return Err(CatalogError::InvalidTable("table has no frames".to_string()));
    }
    renumber(&mut rows);
    Ok(rows)
}

/// 转换为序列
///
/// 每行一帧：运动时间 0，停留时间为该行的延时，最后一帧不停留。
pub fn table_to_skill(
    rows: &[TableRow],
    template: &[ServoState],
    name: impl Into<String>,
) -> Result<Skill, CatalogError> {
    let mut skill = Skill::new(name);
    let last = rows.len().saturating_sub(1);
    for (index, row) in rows.iter().enumerate() {
        let hold = if index == last { 0 } else { row.delay_ms() };
        skill.push_frame(Frame::with_timing(row.to_servos(template)?, 0, hold));
    }
    Ok(skill)
}

/// 导出为 CSV（带表头，行之间用 `\n` 分隔，无结尾换行）
pub fn table_to_csv(rows: &[TableRow]) -> String {
    let mut csv = String::from(CSV_HEADER);
    for row in rows {
        let _ = write!(csv, "\n{},{},{}", row.frame, row.speed, row.delay);
        for angle in row.angles() {
            let _ = write!(csv, ",{angle}");
        }
    }
    csv
}

#[cfg(test)]
mod tests {
    use super::*;
    use luci_protocol::incremental_roster;

    fn row(frame: u32, base: f64) -> TableRow {
        TableRow {
            base,
            ..TableRow::new(frame)
        }
    }

    #[test]
    fn test_velocity_and_delay_conversion() {
        let mut r = TableRow::new(1);
        assert_eq!(r.velocity(), 256);
        assert_eq!(r.delay_ms(), 1000);

        r.speed = 5.0;
        r.delay = 0.25;
        assert_eq!(r.velocity(), 640);
        assert_eq!(r.delay_ms(), 250);

        r.speed = 100.0;
        r.delay = -1.0;
        assert_eq!(r.velocity(), 1023);
        assert_eq!(r.delay_ms(), 0);
    }

    #[test]
    fn test_to_servos_fills_missing_slots() {
        let template = incremental_roster(2, ServoKind::Extended).unwrap();
        let mut r = row(1, 273.0);
        r.servo7 = 187.0;

        let servos = r.to_servos(&template).unwrap();
        assert_eq!(servos.len(), 8);
        assert_eq!(servos[0].angle(), 273.0);
        assert_eq!(servos[7].angle(), 187.0);
        assert_eq!(servos[7].physical_id(), 8);
        assert_eq!(servos[7].kind(), ServoKind::Extended);
        assert!(servos.iter().all(|s| s.is_active() && s.velocity() == 256));
    }

    #[test]
    fn test_to_servos_keeps_extra_template_entries() {
        let mut template = incremental_roster(10, ServoKind::Standard).unwrap();
        template[0].set_active(false);
        template[9].set_angle(42.0);

        let servos = row(1, 100.0).to_servos(&template).unwrap();
        assert_eq!(servos.len(), 10);
        assert!(servos[0].is_active());
        assert_eq!(servos[9].angle(), 42.0);
        assert_eq!(servos[9].velocity(), 256);
    }

    #[test]
    fn test_table_to_skill_last_frame_has_no_hold() {
        let rows = vec![row(1, 180.0), row(2, 273.0), row(3, 186.0)];
        let skill = table_to_skill(&rows, &[], "table").unwrap();

        assert_eq!(skill.len(), 3);
        let holds: Vec<u32> = skill.frames.iter().map(|f| f.hold).collect();
        assert_eq!(holds, vec![1000, 1000, 0]);
        assert!(skill.frames.iter().all(|f| f.duration == 0));
        assert_eq!(skill.frames[1].servos[0].angle(), 273.0);
    }

    #[test]
    fn test_parse_table_json_renumbers() {
        let json = serde_json::to_string(&vec![row(7, 1.0), row(3, 2.0)]).unwrap();
        let rows = parse_table_json(&json).unwrap();
        assert_eq!(rows[0].frame, 1);
        assert_eq!(rows[1].frame, 2);
        assert_eq!(rows[1].base, 2.0);
    }

    #[test]
    fn test_parse_table_json_rejects_invalid() {
        assert!(matches!(
            parse_table_json("[]"),
            Err(CatalogError::InvalidTable(_))
        ));
        assert!(parse_table_json(r#"[{"frame":1,"speed":2,"delay":1,"base":180}]"#).is_err());
        assert!(parse_table_json(r#"{"frame":1}"#).is_err());
    }

    #[test]
    fn test_table_to_csv() {
        let mut r = row(1, 273.0);
        r.servo3 = 205.5;
        let csv = table_to_csv(&[r]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "1,2,1,273,180,180,205.5,180,180,180,180");
    }
}
