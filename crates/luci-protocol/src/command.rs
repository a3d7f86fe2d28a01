//! `SetServoPartial` 指令编码
//!
//! 把一组舵机状态编码为一条或多条 ASCII 指令。编码器只产生指令正文，
//! 换行符由写入端负责追加。
//!
//! # 格式
//!
//! ```text
//! batch:       LUCI_local 245 SetServoPartial:<id1>:<id2>:<pos1>:<pos2>:<vel1>:<vel2>
//! interleaved: LUCI_local 245 SetServoPartial:<id1>:<pos1>:<vel1>:<id2>:<pos2>:<vel2>
//! separate:    LUCI_local 245 SetServoPartial:<id>:<pos>:<vel>   （每个舵机一条）
//! ```
//!
//! 未激活的舵机在编码前被过滤；过滤后为空则不产生任何指令。

use std::fmt::{self, Write as _};
use std::str::FromStr;
use std::time::Duration;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use smallvec::SmallVec;

use crate::servo::ServoState;
use crate::{COMMAND, PROTOCOL_ID, ProtocolError, TARGET};

/// `separate` 格式相邻指令之间的强制间隔
///
/// 硬件节流要求：省略会导致接收端缓冲区溢出。
pub const SEPARATE_COMMAND_PACING: Duration = Duration::from_millis(10);

/// 指令缓冲区
///
/// batch / interleaved 只有 1 条指令，内联存储避免堆分配；
/// separate 每个舵机一条，超过 1 条时溢出到堆。
pub type CommandBuffer = SmallVec<[String; 1]>;

/// 指令格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
#[repr(u8)]
pub enum CommandFormat {
    /// 一条指令：所有 ID，然后所有位置，然后所有速度
    #[default]
    Batch = 0,

    /// 一条指令：每个舵机的 `id:pos:vel` 依次排列
    Interleaved = 1,

    /// 每个舵机一条指令，相邻指令间隔 [`SEPARATE_COMMAND_PACING`]
    Separate = 2,
}

impl CommandFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandFormat::Batch => "batch",
            CommandFormat::Interleaved => "interleaved",
            CommandFormat::Separate => "separate",
        }
    }

    /// 该格式下相邻指令的发送间隔
    pub fn pacing(self) -> Option<Duration> {
        match self {
            CommandFormat::Separate => Some(SEPARATE_COMMAND_PACING),
            _ => None,
        }
    }
}

impl fmt::Display for CommandFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandFormat {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "batch" => Ok(CommandFormat::Batch),
            "interleaved" => Ok(CommandFormat::Interleaved),
            "separate" => Ok(CommandFormat::Separate),
            other => Err(ProtocolError::UnknownCommandFormat(other.to_string())),
        }
    }
}

/// 单个舵机的线上目标（已量化）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoTarget {
    /// 0 基地址
    pub id: u8,
    /// 固件位置值
    pub position: u16,
    /// 速度
    pub velocity: u16,
}

impl From<&ServoState> for ServoTarget {
    fn from(servo: &ServoState) -> Self {
        Self {
            id: servo.active_id(),
            position: servo.position(),
            velocity: servo.velocity(),
        }
    }
}

/// 过滤出激活舵机并量化，保持输入顺序
pub fn active_targets(servos: &[ServoState]) -> Vec<ServoTarget> {
    servos
        .iter()
        .filter(|servo| servo.is_active())
        .map(ServoTarget::from)
        .collect()
}

/// 按指定格式编码
///
/// 没有激活舵机时返回空缓冲区。
pub fn encode(servos: &[ServoState], format: CommandFormat) -> CommandBuffer {
    let targets = active_targets(servos);
    if targets.is_empty() {
        return CommandBuffer::new();
    }

    match format {
        CommandFormat::Batch => smallvec::smallvec![encode_batch(&targets)],
        CommandFormat::Interleaved => smallvec::smallvec![encode_interleaved(&targets)],
        CommandFormat::Separate => targets.iter().map(encode_target).collect(),
    }
}

/// 单舵机寻址：无论全局格式如何，总是使用 separate 的单条形式
pub fn encode_single(servo: &ServoState) -> String {
    encode_target(&ServoTarget::from(servo))
}

/// batch 格式：`ids… : positions… : velocities…`
pub fn encode_batch(targets: &[ServoTarget]) -> String {
    let mut fields: Vec<u16> = Vec::with_capacity(targets.len() * 3);
    fields.extend(targets.iter().map(|t| u16::from(t.id)));
    fields.extend(targets.iter().map(|t| t.position));
    fields.extend(targets.iter().map(|t| t.velocity));
    with_header(&fields)
}

/// interleaved 格式：`id:pos:vel` 依次排列
pub fn encode_interleaved(targets: &[ServoTarget]) -> String {
    let fields: Vec<u16> = targets
        .iter()
        .flat_map(|t| [u16::from(t.id), t.position, t.velocity])
        .collect();
    with_header(&fields)
}

fn encode_target(target: &ServoTarget) -> String {
    with_header(&[u16::from(target.id), target.position, target.velocity])
}

fn with_header(fields: &[u16]) -> String {
    let mut command = format!("{PROTOCOL_ID} {TARGET} {COMMAND}");
    for field in fields {
        // 写入 String 不会失败
        let _ = write!(command, ":{field}");
    }
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::servo::{AngleMode, ServoKind};

    fn fixture() -> Vec<ServoState> {
        vec![
            ServoState::new(1, ServoKind::Standard)
                .unwrap()
                .with_angle(180.0)
                .with_velocity(256),
            ServoState::new(2, ServoKind::Standard)
                .unwrap()
                .with_angle(0.0)
                .with_velocity(100),
        ]
    }

    #[test]
    fn test_batch_fixture() {
        let commands = encode(&fixture(), CommandFormat::Batch);
        assert_eq!(commands.len(), 1);
        // 180 / 300 * 1023 = 613.8 -> 613
        assert_eq!(commands[0], "LUCI_local 245 SetServoPartial:0:1:613:0:256:100");
    }

    #[test]
    fn test_interleaved_fixture() {
        let commands = encode(&fixture(), CommandFormat::Interleaved);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0], "LUCI_local 245 SetServoPartial:0:613:256:1:0:100");
    }

    #[test]
    fn test_separate_fixture() {
        let commands = encode(&fixture(), CommandFormat::Separate);
        assert_eq!(
            commands.as_slice(),
            [
                "LUCI_local 245 SetServoPartial:0:613:256",
                "LUCI_local 245 SetServoPartial:1:0:100",
            ]
        );
    }

    #[test]
    fn test_inactive_servos_filtered() {
        let lone = vec![ServoState::new(1, ServoKind::Standard).unwrap().with_active(false)];
        assert!(encode(&lone, CommandFormat::Batch).is_empty());
        assert!(encode(&lone, CommandFormat::Interleaved).is_empty());
        assert!(encode(&lone, CommandFormat::Separate).is_empty());

        let mut mixed = fixture();
        mixed[0].set_active(false);
        let commands = encode(&mixed, CommandFormat::Batch);
        assert_eq!(commands[0], "LUCI_local 245 SetServoPartial:1:0:100");
    }

    #[test]
    fn test_empty_input() {
        assert!(encode(&[], CommandFormat::Batch).is_empty());
    }

    #[test]
    fn test_encode_single_ignores_format() {
        let servo = ServoState::new(4, ServoKind::Extended)
            .unwrap()
            .with_angle_mode(AngleMode::Deg360)
            .with_angle(360.0)
            .with_velocity(512);
        assert_eq!(encode_single(&servo), "LUCI_local 245 SetServoPartial:3:4095:512");
    }

    #[test]
    fn test_format_parse_and_display() {
        for format in [
            CommandFormat::Batch,
            CommandFormat::Interleaved,
            CommandFormat::Separate,
        ] {
            assert_eq!(format.to_string().parse::<CommandFormat>().unwrap(), format);
        }
        assert_eq!("BATCH".parse::<CommandFormat>().unwrap(), CommandFormat::Batch);
        assert!("burst".parse::<CommandFormat>().is_err());
    }

    #[test]
    fn test_format_u8_conversion() {
        assert_eq!(u8::from(CommandFormat::Separate), 2);
        assert_eq!(CommandFormat::try_from(1u8).unwrap(), CommandFormat::Interleaved);
        assert!(CommandFormat::try_from(9u8).is_err());
    }

    #[test]
    fn test_pacing() {
        assert_eq!(CommandFormat::Separate.pacing(), Some(SEPARATE_COMMAND_PACING));
        assert_eq!(CommandFormat::Batch.pacing(), None);
    }
}
