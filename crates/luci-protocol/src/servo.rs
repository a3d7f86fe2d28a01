//! 舵机状态定义
//!
//! [`ServoState`] 是单个舵机的指令目标。所有字段私有，通过方法维护以下不变量：
//!
//! - `active_id == physical_id - 1`（只在 [`ServoState::set_physical_id`] 中推导）
//! - `angle ∈ [0, max_angle(kind, angle_mode)]`
//! - `velocity ∈ [0, 1023]`
//! - Standard 舵机没有角度模式

use std::fmt;
use std::str::FromStr;

use crate::ProtocolError;
use crate::numeric::{self, MAX_VELOCITY};

/// 默认速度
pub const DEFAULT_VELOCITY: u16 = 256;

/// 最大物理 ID（总线地址）
pub const MAX_PHYSICAL_ID: u8 = 253;

/// 舵机链最大数量
pub const MAX_ROSTER_SIZE: usize = 16;

/// 舵机类型
///
/// 决定角度范围与位置分辨率。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub enum ServoKind {
    /// AX 系列：固定 0–300°，10 位位置（0–1023）
    #[default]
    Standard,

    /// MX 系列：0–300° 或 0–360°，12 位位置（0–4095）
    Extended,
}

impl ServoKind {
    /// 线上（导出文件）使用的型号名
    pub fn model_name(self) -> &'static str {
        match self {
            ServoKind::Standard => "AX-12A",
            ServoKind::Extended => "MX-64",
        }
    }
}

impl fmt::Display for ServoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_name())
    }
}

impl FromStr for ServoKind {
    type Err = ProtocolError;

    /// 接受型号名（`AX-12A`、`AX-18A`、`MX-28`、`MX-64` …）或 `standard` / `extended`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if upper.starts_with("AX") || upper == "STANDARD" {
            Ok(ServoKind::Standard)
        } else if upper.starts_with("MX") || upper == "EXTENDED" {
            Ok(ServoKind::Extended)
        } else {
            Err(ProtocolError::UnknownServoType(s.to_string()))
        }
    }
}

impl TryFrom<String> for ServoKind {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ServoKind> for String {
    fn from(kind: ServoKind) -> Self {
        kind.model_name().to_string()
    }
}

/// Extended 舵机的角度模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub enum AngleMode {
    /// 0–300°
    Deg300,
    /// 0–360°
    Deg360,
}

impl AngleMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AngleMode::Deg300 => "300",
            AngleMode::Deg360 => "360",
        }
    }
}

impl fmt::Display for AngleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AngleMode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "300" => Ok(AngleMode::Deg300),
            "360" => Ok(AngleMode::Deg360),
            other => Err(ProtocolError::UnknownAngleMode(other.to_string())),
        }
    }
}

impl TryFrom<String> for AngleMode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AngleMode> for String {
    fn from(mode: AngleMode) -> Self {
        mode.as_str().to_string()
    }
}

/// 单个舵机的指令目标
///
/// # 示例
///
/// ```rust
/// use luci_protocol::{ServoKind, ServoState};
///
/// let servo = ServoState::new(1, ServoKind::Standard)
///     .unwrap()
///     .with_angle(180.0)
///     .with_velocity(256);
///
/// assert_eq!(servo.active_id(), 0);
/// assert_eq!(servo.position(), 613);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "ServoRecord", into = "ServoRecord")
)]
pub struct ServoState {
    active_id: u8,
    physical_id: u8,
    kind: ServoKind,
    angle_mode: Option<AngleMode>,
    angle: f64,
    velocity: u16,
    active: bool,
    /// 导入时的型号名，仅在与类型默认型号不同时保存
    model: Option<String>,
}

impl ServoState {
    /// 创建舵机状态（中位角度、默认速度、激活）
    ///
    /// Extended 舵机默认使用 360° 模式。
    pub fn new(physical_id: u8, kind: ServoKind) -> Result<Self, ProtocolError> {
        let angle_mode = match kind {
            ServoKind::Standard => None,
            ServoKind::Extended => Some(AngleMode::Deg360),
        };
        let mut servo = Self {
            active_id: 0,
            physical_id: 1,
            kind,
            angle_mode,
            angle: numeric::center_angle(kind, angle_mode),
            velocity: DEFAULT_VELOCITY,
            active: true,
            model: None,
        };
        servo.set_physical_id(u16::from(physical_id))?;
        Ok(servo)
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.set_angle(angle);
        self
    }

    pub fn with_velocity(mut self, velocity: u16) -> Self {
        self.set_velocity(velocity);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_angle_mode(mut self, mode: AngleMode) -> Self {
        self.set_angle_mode(mode);
        self
    }

    /// 指令中使用的 0 基地址
    pub fn active_id(&self) -> u8 {
        self.active_id
    }

    /// 总线物理地址（1..=253）
    pub fn physical_id(&self) -> u8 {
        self.physical_id
    }

    pub fn kind(&self) -> ServoKind {
        self.kind
    }

    /// 型号名（`MX-28` 等导入的型号原样保留）
    pub fn model_name(&self) -> &str {
        self.model.as_deref().unwrap_or(self.kind.model_name())
    }

    pub fn angle_mode(&self) -> Option<AngleMode> {
        self.angle_mode
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn velocity(&self) -> u16 {
        self.velocity
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// 当前类型与模式下的最大角度
    pub fn max_angle(&self) -> f64 {
        numeric::max_angle(self.kind, self.angle_mode)
    }

    /// 当前角度对应的固件位置值
    pub fn position(&self) -> u16 {
        numeric::angle_to_position(self.angle, self.kind, self.angle_mode)
    }

    /// 设置物理 ID，并同步推导 `active_id = physical_id - 1`
    ///
    /// 这是唯一推导 `active_id` 的地方。
    pub fn set_physical_id(&mut self, physical_id: u16) -> Result<(), ProtocolError> {
        if physical_id == 0 || physical_id > u16::from(MAX_PHYSICAL_ID) {
            return Err(ProtocolError::InvalidPhysicalId(physical_id));
        }
        self.physical_id = physical_id as u8;
        self.active_id = self.physical_id - 1;
        Ok(())
    }

    /// 设置角度（限制在当前最大角度内）
    pub fn set_angle(&mut self, angle: f64) {
        self.angle = numeric::clamp_angle(angle, self.max_angle());
    }

    /// 设置速度（限制在 0..=1023）
    pub fn set_velocity(&mut self, velocity: u16) {
        self.velocity = velocity.min(MAX_VELOCITY);
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// 切换角度模式，保持相对位置
    ///
    /// Standard 舵机没有角度模式，调用无效果。
    pub fn set_angle_mode(&mut self, mode: AngleMode) {
        if self.kind == ServoKind::Standard {
            return;
        }
        let old_max = self.max_angle();
        let new_max = numeric::max_angle(self.kind, Some(mode));
        self.angle_mode = Some(mode);
        self.angle = numeric::clamp_angle(
            numeric::rescale_angle(self.angle, old_max, new_max),
            new_max,
        );
    }

    /// 切换舵机类型，角度重新限制到新范围
    pub fn set_kind(&mut self, kind: ServoKind) {
        if kind != self.kind {
            self.model = None;
        }
        self.kind = kind;
        self.angle_mode = match kind {
            ServoKind::Standard => None,
            ServoKind::Extended => Some(self.angle_mode.unwrap_or(AngleMode::Deg360)),
        };
        self.angle = numeric::clamp_angle(self.angle, self.max_angle());
    }

    /// 移动到中位
    pub fn center(&mut self) {
        self.angle = numeric::center_angle(self.kind, self.angle_mode);
    }
}

/// 创建顺序编号的舵机链（物理 ID 为 `1..=count`）
pub fn incremental_roster(count: usize, kind: ServoKind) -> Result<Vec<ServoState>, ProtocolError> {
    if count == 0 || count > MAX_ROSTER_SIZE {
        return Err(ProtocolError::InvalidServoCount(count));
    }
    (1..=count)
        .map(|physical_id| ServoState::new(physical_id as u8, kind))
        .collect()
}

/// 导出文件中的舵机记录
///
/// 字段名与原有 JSON 导出格式保持一致（`id`、`servoId`、`servoType` …）。
/// 解码时 `id` 被忽略，由 `servoId` 重新推导；`servoType` 原样保留。
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServoRecord {
    #[serde(default)]
    id: Option<u16>,
    servo_id: u16,
    servo_type: String,
    angle: f64,
    velocity: u16,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    angle_mode: Option<AngleMode>,
}

#[cfg(feature = "serde")]
fn default_active() -> bool {
    true
}

#[cfg(feature = "serde")]
impl TryFrom<ServoRecord> for ServoState {
    type Error = ProtocolError;

    fn try_from(record: ServoRecord) -> Result<Self, Self::Error> {
        let physical_id = u8::try_from(record.servo_id)
            .map_err(|_| ProtocolError::InvalidPhysicalId(record.servo_id))?;
        let kind: ServoKind = record.servo_type.parse()?;
        let mut servo = ServoState::new(physical_id, kind)?;
        let model = record.servo_type.trim();
        if model != kind.model_name() {
            servo.model = Some(model.to_string());
        }
        if kind == ServoKind::Extended {
            servo.angle_mode = record.angle_mode.or(servo.angle_mode);
        }
        servo.set_angle(record.angle);
        servo.set_velocity(record.velocity);
        servo.active = record.active;
        Ok(servo)
    }
}

#[cfg(feature = "serde")]
impl From<ServoState> for ServoRecord {
    fn from(servo: ServoState) -> Self {
        Self {
            id: Some(u16::from(servo.active_id)),
            servo_id: u16::from(servo.physical_id),
            servo_type: servo.model_name().to_string(),
            angle: servo.angle,
            velocity: servo.velocity,
            active: servo.active,
            angle_mode: servo.angle_mode,
        }
    }
}
