//! 播放状态定义
//!
//! `Idle → Playing → (Paused ⇄ Playing) → Idle`

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum PlaybackState {
    #[default]
    Idle = 0,
    Playing = 1,
    Paused = 2,
}

impl PlaybackState {
    /// 播放中或暂停中
    pub fn is_active(self) -> bool {
        self != PlaybackState::Idle
    }
}

/// 播放状态（原子版本，与播放任务共享）
#[derive(Debug, Default)]
pub struct AtomicPlaybackState {
    inner: AtomicU8,
}

impl AtomicPlaybackState {
    pub fn new(state: PlaybackState) -> Self {
        Self {
            inner: AtomicU8::new(state.into()),
        }
    }

    /// 无效值按 `Idle` 处理
    pub fn get(&self, ordering: Ordering) -> PlaybackState {
        PlaybackState::try_from(self.inner.load(ordering)).unwrap_or_default()
    }

    pub fn set(&self, state: PlaybackState, ordering: Ordering) {
        self.inner.store(state.into(), ordering);
    }

    /// 当前值等于 `current` 时设置为 `new` 并返回 true
    pub fn compare_exchange(
        &self,
        current: PlaybackState,
        new: PlaybackState,
        success: Ordering,
        failure: Ordering,
    ) -> bool {
        self.inner
            .compare_exchange(current.into(), new.into(), success, failure)
            .is_ok()
    }
}

/// 播放范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayMode {
    /// 从第一帧播放到最后一帧
    #[default]
    All,
    /// 从选中帧播放到最后一帧
    FromSelected,
    /// 只播放选中帧（忽略循环）
    SelectedOnly,
}

impl PlayMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayMode::All => "all",
            PlayMode::FromSelected => "from-selected",
            PlayMode::SelectedOnly => "selected-only",
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(PlayMode::All),
            "from-selected" | "from_selected" => Ok(PlayMode::FromSelected),
            "selected-only" | "selected_only" => Ok(PlayMode::SelectedOnly),
            other => Err(format!("unknown play mode: {other}")),
        }
    }
}

/// 单步方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Prev,
    Next,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_playback_state() {
        let state = AtomicPlaybackState::default();
        assert_eq!(state.get(Ordering::Relaxed), PlaybackState::Idle);
        assert!(!state.get(Ordering::Relaxed).is_active());

        assert!(state.compare_exchange(
            PlaybackState::Idle,
            PlaybackState::Playing,
            Ordering::AcqRel,
            Ordering::Acquire
        ));
        assert!(!state.compare_exchange(
            PlaybackState::Idle,
            PlaybackState::Playing,
            Ordering::AcqRel,
            Ordering::Acquire
        ));

        state.set(PlaybackState::Paused, Ordering::Release);
        assert!(state.get(Ordering::Acquire).is_active());
    }

    #[test]
    fn test_play_mode_parse() {
        assert_eq!("all".parse::<PlayMode>().unwrap(), PlayMode::All);
        assert_eq!("From-Selected".parse::<PlayMode>().unwrap(), PlayMode::FromSelected);
        assert_eq!("selected_only".parse::<PlayMode>().unwrap(), PlayMode::SelectedOnly);
        assert!("random".parse::<PlayMode>().is_err());
        assert_eq!(PlayMode::SelectedOnly.to_string(), "selected-only");
    }
}
