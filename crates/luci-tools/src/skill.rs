//! 动作序列（Skill）与帧（Frame）
//!
//! 纯数据结构：帧是舵机目标的一份快照加上运动时间和停留时间，
//! 序列拥有有序的帧列表。导出格式字段名保持 `createdAt` / `loop` 等 camelCase 形式。

use std::time::Duration;

use luci_protocol::ServoState;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::timestamp::now_millis;

/// 捕获帧的默认运动时间（毫秒）
pub const DEFAULT_FRAME_DURATION_MS: u32 = 500;

/// 捕获帧的默认停留时间（毫秒）
pub const DEFAULT_FRAME_HOLD_MS: u32 = 200;

/// 生成的 id 长度
pub const ID_LENGTH: usize = 9;

const ID_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// 生成 9 位 base-36 随机 id
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LENGTH)
        .map(|_| char::from(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())]))
        .collect()
}

/// 序列中的一帧
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub id: String,
    /// 舵机目标快照（独立拥有，不随实时舵机变化）
    pub servos: Vec<ServoState>,
    /// 运动时间（毫秒）
    pub duration: u32,
    /// 到位后的停留时间（毫秒）
    pub hold: u32,
}

impl Frame {
    /// 捕获当前舵机状态（深拷贝），使用默认时间
    pub fn capture(servos: &[ServoState]) -> Self {
        Self::with_timing(servos.to_vec(), DEFAULT_FRAME_DURATION_MS, DEFAULT_FRAME_HOLD_MS)
    }

    pub fn with_timing(servos: Vec<ServoState>, duration: u32, hold: u32) -> Self {
        Self {
            id: generate_id(),
            servos,
            duration,
            hold,
        }
    }

    /// 激活的舵机（保持顺序）
    pub fn active_servos(&self) -> Vec<ServoState> {
        self.servos.iter().filter(|s| s.is_active()).cloned().collect()
    }

    /// 运动时间 + 停留时间（毫秒）
    pub fn total_ms(&self) -> u64 {
        u64::from(self.duration) + u64::from(self.hold)
    }

    /// 按播放速度缩放后的等待时间
    ///
    /// `speed` 不是有限正数时按 1.0 处理。
    pub fn playback_delay(&self, speed: f64) -> Duration {
        let speed = if speed.is_finite() && speed > 0.0 { speed } else { 1.0 };
        Duration::from_secs_f64(self.total_ms() as f64 / speed / 1000.0)
    }

    /// 深拷贝并分配新 id
    pub fn duplicate(&self) -> Self {
        Self {
            id: generate_id(),
            ..self.clone()
        }
    }
}

/// 动作序列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub frames: Vec<Frame>,
    /// 创建时间（Unix 毫秒）
    #[serde(default)]
    pub created_at: u64,
    /// 播放到末尾后是否从头开始
    #[serde(rename = "loop", default)]
    pub looping: bool,
}

impl Skill {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            frames: Vec::new(),
            created_at: now_millis(),
            looping: false,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// 追加一帧当前舵机状态的快照，返回新帧 id
    pub fn capture(&mut self, servos: &[ServoState]) -> String {
        let frame = Frame::capture(servos);
        let id = frame.id.clone();
        self.frames.push(frame);
        id
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn index_of(&self, frame_id: &str) -> Option<usize> {
        self.frames.iter().position(|f| f.id == frame_id)
    }

    pub fn frame(&self, frame_id: &str) -> Option<&Frame> {
        self.frames.iter().find(|f| f.id == frame_id)
    }

    pub fn frame_mut(&mut self, frame_id: &str) -> Option<&mut Frame> {
        self.frames.iter_mut().find(|f| f.id == frame_id)
    }

    pub fn remove_frame(&mut self, frame_id: &str) -> Option<Frame> {
        let index = self.index_of(frame_id)?;
        Some(self.frames.remove(index))
    }

    /// 复制一帧插入到其后，返回新帧 id
    pub fn duplicate_frame(&mut self, frame_id: &str) -> Option<String> {
        let index = self.index_of(frame_id)?;
        let copy = self.frames[index].duplicate();
        let id = copy.id.clone();
        self.frames.insert(index + 1, copy);
        Some(id)
    }

    /// 把 `from` 处的帧移动到 `to`（移除后的下标）
    ///
    /// 下标越界时不做修改并返回 false。
    pub fn move_frame(&mut self, from: usize, to: usize) -> bool {
        if from >= self.frames.len() || to >= self.frames.len() {
            return false;
        }
        let frame = self.frames.remove(from);
        self.frames.insert(to, frame);
        true
    }

    /// 一次完整播放的总时长（速度 1.0）
    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.frames.iter().map(Frame::total_ms).sum())
    }
}
