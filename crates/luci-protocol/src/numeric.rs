//! 数值模型
//!
//! 舵机类型/角度模式到角度范围和位置编码的映射，全部为无状态纯函数。
//!
//! 位置量化必须与固件逐位一致：只做一次 `floor`，不做四舍五入。
//!
//! ```text
//! Standard (AX):  0..=300°           -> 0..=1023
//! Extended (MX):  0..=300° / 0..=360° -> 0..=4095
//! ```

use crate::servo::{AngleMode, ServoKind};

/// Standard 舵机（10 位）位置满量程
pub const STANDARD_POSITION_SCALE: u16 = 1023;

/// Extended 舵机（12 位）位置满量程
pub const EXTENDED_POSITION_SCALE: u16 = 4095;

/// 速度上限（两种舵机一致）
pub const MAX_VELOCITY: u16 = 1023;

/// 300° 角度范围
pub const RANGE_300: f64 = 300.0;

/// 360° 角度范围
pub const RANGE_360: f64 = 360.0;

/// 是否为扩展量程舵机（12 位位置）
#[inline]
pub fn is_extended_range(kind: ServoKind) -> bool {
    kind == ServoKind::Extended
}

/// 最大角度（度）
///
/// - Standard: 固定 300°
/// - Extended: `Deg300` 模式为 300°，其余（含未设置）为 360°
pub fn max_angle(kind: ServoKind, mode: Option<AngleMode>) -> f64 {
    match (kind, mode) {
        (ServoKind::Standard, _) => RANGE_300,
        (ServoKind::Extended, Some(AngleMode::Deg300)) => RANGE_300,
        (ServoKind::Extended, _) => RANGE_360,
    }
}

/// 中位角度（度）
pub fn center_angle(kind: ServoKind, mode: Option<AngleMode>) -> f64 {
    max_angle(kind, mode) / 2.0
}

/// 位置满量程
#[inline]
pub fn position_scale(kind: ServoKind) -> u16 {
    if is_extended_range(kind) {
        EXTENDED_POSITION_SCALE
    } else {
        STANDARD_POSITION_SCALE
    }
}

/// 将角度限制在 `[0, max]` 内
///
/// NaN 视为 0，保证编码路径永不失败。
pub fn clamp_angle(angle: f64, max: f64) -> f64 {
    if angle.is_nan() {
        return 0.0;
    }
    angle.clamp(0.0, max)
}

/// 角度转换为固件位置值
///
/// `floor(angle / max_angle * scale)`，角度先被限制在合法范围内。
pub fn angle_to_position(angle: f64, kind: ServoKind, mode: Option<AngleMode>) -> u16 {
    let max = max_angle(kind, mode);
    let clamped = clamp_angle(angle, max);
    let scale = f64::from(position_scale(kind));

    // clamped / max ∈ [0, 1]，结果不会超过 scale
    ((clamped / max) * scale).floor() as u16
}

/// 角度模式切换时重新映射角度，保持相对位置而非原始度数
///
/// `round((angle / old_max) * new_max)`
pub fn rescale_angle(angle: f64, old_max: f64, new_max: f64) -> f64 {
    if old_max <= 0.0 {
        return 0.0;
    }
    let relative = clamp_angle(angle, old_max) / old_max;
    (relative * new_max).round()
}
