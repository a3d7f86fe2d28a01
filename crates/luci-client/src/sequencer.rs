//! 序列播放器
//!
//! 按时间顺序把一个 [`Skill`] 的帧发送到 [`FrameSink`]。
//!
//! # 并发模型
//!
//! 每次播放启动一个 tokio 任务。控制端和播放任务共享：
//! - 原子播放状态（暂停 / 恢复只修改它）
//! - 运行槽：代数计数器 + 本次播放的取消令牌
//! - 播放头（`watch` 通道）
//!
//! `stop()` 递增代数并取消令牌：正在进行的等待立即返回，之后不会再发送任何帧；
//! 已经开始发送的那一帧会完整发送。
//! 播放任务自然结束时只在代数未变时才把状态置回 `Idle`，
//! 因此旧任务不会覆盖新一次播放的状态。

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use luci_driver::FrameSink;
use luci_tools::{Frame, Skill};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::state::{AtomicPlaybackState, PlayMode, PlaybackState, StepDirection};

/// 暂停期间的轮询间隔
pub const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 最小播放速度
pub const MIN_SPEED: f64 = 0.1;

/// 最大播放速度
pub const MAX_SPEED: f64 = 5.0;

/// 校验播放速度
pub fn validate_speed(speed: f64) -> Result<f64, ClientError> {
    if speed.is_finite() && (MIN_SPEED..=MAX_SPEED).contains(&speed) {
        Ok(speed)
    } else {
        Err(ClientError::InvalidSpeed(speed))
    }
}

struct RunSlot {
    generation: u64,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    state: AtomicPlaybackState,
    run: Mutex<RunSlot>,
    playhead: watch::Sender<Option<usize>>,
}

impl Shared {
    /// 自然结束：代数未变时回到 Idle
    fn finish(&self, generation: u64) {
        let slot = self.run.lock();
        if slot.generation == generation {
            self.state.set(PlaybackState::Idle, Ordering::Release);
            self.playhead.send_replace(None);
            debug!(generation, "Playback finished");
        }
    }
}

/// 一次播放的快照
struct RunPlan {
    /// `[start, end)` 范围内的帧
    frames: Vec<Frame>,
    start: usize,
    looping: bool,
    speed: f64,
}

/// 序列播放器
pub struct Sequencer<S: FrameSink + 'static> {
    sink: Arc<S>,
    shared: Arc<Shared>,
    selected: Option<usize>,
}

impl<S: FrameSink + 'static> Sequencer<S> {
    pub fn new(sink: Arc<S>) -> Self {
        let (playhead, _) = watch::channel(None);
        Self {
            sink,
            shared: Arc::new(Shared {
                state: AtomicPlaybackState::new(PlaybackState::Idle),
                run: Mutex::new(RunSlot {
                    generation: 0,
                    cancel: CancellationToken::new(),
                    task: None,
                }),
                playhead,
            }),
            selected: None,
        }
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.state.get(Ordering::Acquire)
    }

    /// 正在执行的帧下标（未播放时为 `None`）
    pub fn playhead(&self) -> Option<usize> {
        *self.shared.playhead.borrow()
    }

    pub fn subscribe_playhead(&self) -> watch::Receiver<Option<usize>> {
        self.shared.playhead.subscribe()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn select(&mut self, index: Option<usize>) {
        self.selected = index;
    }

    /// 开始播放（必须在 tokio 运行时内调用）
    ///
    /// 序列在此刻被快照，之后对序列的修改不影响本次播放。
    /// 已在播放、未连接或序列为空时不做任何事并返回 `Ok(false)`。
    pub fn play(&mut self, skill: &Skill, mode: PlayMode, speed: f64) -> Result<bool, ClientError> {
        let speed = validate_speed(speed)?;

        if skill.is_empty() || !self.sink.is_connected() {
            debug!(frames = skill.len(), "Play ignored: empty skill or not connected");
            return Ok(false);
        }
        if !self.shared.state.compare_exchange(
            PlaybackState::Idle,
            PlaybackState::Playing,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            debug!("Play ignored: already playing");
            return Ok(false);
        }

        let len = skill.len();
        let start = match mode {
            PlayMode::All => 0,
            PlayMode::FromSelected | PlayMode::SelectedOnly => {
                self.selected.filter(|&i| i < len).unwrap_or(0)
            },
        };
        let end = if mode == PlayMode::SelectedOnly { start + 1 } else { len };

        let plan = RunPlan {
            frames: skill.frames[start..end].to_vec(),
            start,
            looping: skill.looping && mode != PlayMode::SelectedOnly,
            speed,
        };

        let mut slot = self.shared.run.lock();
        slot.generation += 1;
        slot.cancel = CancellationToken::new();
        let generation = slot.generation;
        let cancel = slot.cancel.clone();

        info!(
            skill = %skill.name,
            %mode,
            start,
            end,
            speed,
            looping = plan.looping,
            "Playback started"
        );
        slot.task = Some(tokio::spawn(run(
            self.sink.clone(),
            self.shared.clone(),
            plan,
            generation,
            cancel,
        )));

        Ok(true)
    }

    /// 暂停（仅在播放中有效）
    pub fn pause(&self) -> bool {
        self.shared.state.compare_exchange(
            PlaybackState::Playing,
            PlaybackState::Paused,
            Ordering::AcqRel,
            Ordering::Acquire,
        )
    }

    /// 恢复（仅在暂停中有效）
    pub fn resume(&self) -> bool {
        self.shared.state.compare_exchange(
            PlaybackState::Paused,
            PlaybackState::Playing,
            Ordering::AcqRel,
            Ordering::Acquire,
        )
    }

    /// 停止播放并清除播放头，返回之前是否在播放
    pub fn stop(&self) -> bool {
        let was_active = {
            let mut slot = self.shared.run.lock();
            slot.generation += 1;
            slot.cancel.cancel();
            slot.task.take();
            let previous = self.shared.state.get(Ordering::Acquire);
            self.shared.state.set(PlaybackState::Idle, Ordering::Release);
            previous.is_active()
        };
        self.shared.playhead.send_replace(None);
        if was_active {
            info!("Playback stopped");
        }
        was_active
    }

    /// 等待当前播放任务结束（循环播放需要先 `stop()`）
    pub async fn wait(&self) {
        let task = self.shared.run.lock().task.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Playback task failed: {}", e);
            }
        }
    }

    /// 选中并立即发送指定帧（与播放状态无关）
    pub async fn goto(&mut self, skill: &Skill, index: usize) -> Result<bool, ClientError> {
        let Some(frame) = skill.frames.get(index) else {
            return Ok(false);
        };
        self.selected = Some(index);

        if !self.sink.is_connected() {
            return Ok(false);
        }
        let active = frame.active_servos();
        if active.is_empty() {
            return Ok(false);
        }
        self.sink.send_frame(&active).await?;
        Ok(true)
    }

    /// 单步：选中相邻帧（首尾回绕）并在已连接时发送，返回新的选中下标
    pub async fn step(
        &mut self,
        skill: &Skill,
        direction: StepDirection,
    ) -> Result<Option<usize>, ClientError> {
        let len = skill.len();
        if len == 0 {
            return Ok(None);
        }

        let current = self.selected.filter(|&i| i < len);
        let next = match (direction, current) {
            (StepDirection::Next, Some(i)) if i + 1 < len => i + 1,
            (StepDirection::Next, _) => 0,
            (StepDirection::Prev, Some(i)) if i > 0 => i - 1,
            (StepDirection::Prev, _) => len - 1,
        };

        self.goto(skill, next).await?;
        Ok(Some(next))
    }
}

impl<S: FrameSink + 'static> Drop for Sequencer<S> {
    fn drop(&mut self) {
        self.shared.run.lock().cancel.cancel();
    }
}

/// 播放任务
async fn run<S: FrameSink + 'static>(
    sink: Arc<S>,
    shared: Arc<Shared>,
    plan: RunPlan,
    generation: u64,
    cancel: CancellationToken,
) {
    loop {
        for (offset, frame) in plan.frames.iter().enumerate() {
            let index = plan.start + offset;

            if cancel.is_cancelled() {
                return;
            }
            while shared.state.get(Ordering::Acquire) == PlaybackState::Paused {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(PAUSE_POLL_INTERVAL) => {},
                }
            }
            if cancel.is_cancelled() {
                return;
            }

            shared.playhead.send_replace(Some(index));

            // 帧间隔从发送前开始计时，节流发送不会拉长帧时间
            let deadline = Instant::now() + frame.playback_delay(plan.speed);

            // 已开始发送的帧总是完整发送，stop 只影响之后的等待
            let active = frame.active_servos();
            if !active.is_empty() {
                match sink.send_frame(&active).await {
                    Ok(_) => {},
                    Err(e) if e.is_cancellation() => return,
                    Err(e) => warn!(frame = index, "Failed to send frame: {}", e),
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep_until(deadline) => {},
            }
        }

        if !plan.looping || cancel.is_cancelled() {
            break;
        }
        // 全部帧时间为 0 时避免独占执行线程
        tokio::task::yield_now().await;
    }

    shared.finish(generation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use luci_driver::DriverError;
    use luci_protocol::{ServoKind, ServoState, incremental_roster};
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    /// 记录每次发送的时间（相对创建时刻）和第一个舵机的角度
    struct RecordingSink {
        origin: Instant,
        sent: parking_lot::Mutex<Vec<(u64, f64)>>,
        connected: AtomicBool,
        fail: AtomicBool,
        /// 模拟节流发送的耗时
        send_time: Duration,
        completed: AtomicUsize,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Self::with_send_time(Duration::ZERO)
        }

        fn with_send_time(send_time: Duration) -> Arc<Self> {
            Arc::new(Self {
                origin: Instant::now(),
                sent: parking_lot::Mutex::new(Vec::new()),
                connected: AtomicBool::new(true),
                fail: AtomicBool::new(false),
                send_time,
                completed: AtomicUsize::new(0),
            })
        }

        fn angles(&self) -> Vec<f64> {
            self.sent.lock().iter().map(|(_, a)| *a).collect()
        }

        fn times(&self) -> Vec<u64> {
            self.sent.lock().iter().map(|(t, _)| *t).collect()
        }
    }

    #[async_trait]
    impl FrameSink for RecordingSink {
        async fn send_frame(&self, servos: &[ServoState]) -> Result<usize, DriverError> {
            let elapsed = self.origin.elapsed().as_millis() as u64;
            self.sent.lock().push((elapsed, servos[0].angle()));
            if !self.send_time.is_zero() {
                tokio::time::sleep(self.send_time).await;
            }
            self.completed.fetch_add(1, Ordering::Relaxed);
            if self.fail.load(Ordering::Relaxed) {
                return Err(DriverError::NotConnected);
            }
            Ok(1)
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::Relaxed)
        }
    }

    /// 第 i 帧的第一个舵机角度为 `i * 10`，每帧 100ms（运动 60 + 停留 40）
    fn skill(frames: usize) -> Skill {
        let roster = incremental_roster(2, ServoKind::Standard).unwrap();
        let mut skill = Skill::new("test");
        for i in 0..frames {
            let mut servos = roster.clone();
            servos[0].set_angle(i as f64 * 10.0);
            skill.push_frame(Frame::with_timing(servos, 60, 40));
        }
        skill
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_all_in_order_with_timing() {
        let sink = RecordingSink::new();
        let mut sequencer = Sequencer::new(sink.clone());

        assert!(sequencer.play(&skill(3), PlayMode::All, 1.0).unwrap());
        assert_eq!(sequencer.state(), PlaybackState::Playing);
        sequencer.wait().await;

        assert_eq!(sink.angles(), vec![0.0, 10.0, 20.0]);
        assert_eq!(sink.times(), vec![0, 100, 200]);
        assert_eq!(sequencer.state(), PlaybackState::Idle);
        assert_eq!(sequencer.playhead(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_scales_waits() {
        let sink = RecordingSink::new();
        let mut sequencer = Sequencer::new(sink.clone());

        sequencer.play(&skill(3), PlayMode::All, 2.0).unwrap();
        sequencer.wait().await;
        assert_eq!(sink.times(), vec![0, 50, 100]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_mid_wait_sends_nothing_further() {
        let sink = RecordingSink::new();
        let mut sequencer = Sequencer::new(sink.clone());

        sequencer.play(&skill(5), PlayMode::All, 1.0).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(sequencer.playhead(), Some(1));

        assert!(sequencer.stop());
        assert_eq!(sequencer.state(), PlaybackState::Idle);
        assert_eq!(sequencer.playhead(), None);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(sink.angles(), vec![0.0, 10.0]);
        assert_eq!(sequencer.playhead(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_lets_in_flight_frame_finish() {
        let sink = RecordingSink::with_send_time(Duration::from_millis(30));
        let mut sequencer = Sequencer::new(sink.clone());

        sequencer.play(&skill(3), PlayMode::All, 1.0).unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(sequencer.stop());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sink.angles(), vec![0.0]);
        assert_eq!(sink.completed.load(Ordering::Relaxed), 1);
        assert_eq!(sequencer.state(), PlaybackState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_time_does_not_stretch_frames() {
        let sink = RecordingSink::with_send_time(Duration::from_millis(30));
        let mut sequencer = Sequencer::new(sink.clone());
        let started = Instant::now();

        sequencer.play(&skill(3), PlayMode::All, 1.0).unwrap();
        sequencer.wait().await;

        assert_eq!(sink.times(), vec![0, 100, 200]);
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_resume_neither_skips_nor_replays() {
        let sink = RecordingSink::new();
        let mut sequencer = Sequencer::new(sink.clone());

        sequencer.play(&skill(3), PlayMode::All, 1.0).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sequencer.pause());
        assert_eq!(sequencer.state(), PlaybackState::Paused);
        assert!(!sequencer.pause());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(sink.angles(), vec![0.0]);

        assert!(sequencer.resume());
        sequencer.wait().await;

        assert_eq!(sink.angles(), vec![0.0, 10.0, 20.0]);
        let times = sink.times();
        assert!(times[1] >= 550, "frame 1 sent at {}", times[1]);
        assert!(times[1] <= 600, "frame 1 sent at {}", times[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_paused() {
        let sink = RecordingSink::new();
        let mut sequencer = Sequencer::new(sink.clone());

        sequencer.play(&skill(3), PlayMode::All, 1.0).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        sequencer.pause();
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(sequencer.stop());
        assert!(!sequencer.resume());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sink.angles(), vec![0.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_looping_restarts_until_stopped() {
        let sink = RecordingSink::new();
        let mut sequencer = Sequencer::new(sink.clone());
        let mut looping = skill(2);
        looping.looping = true;

        sequencer.play(&looping, PlayMode::All, 1.0).unwrap();
        tokio::time::sleep(Duration::from_millis(450)).await;
        sequencer.stop();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(sink.angles(), vec![0.0, 10.0, 0.0, 10.0, 0.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selected_only_ignores_loop() {
        let sink = RecordingSink::new();
        let mut sequencer = Sequencer::new(sink.clone());
        let mut looping = skill(3);
        looping.looping = true;

        sequencer.select(Some(1));
        sequencer.play(&looping, PlayMode::SelectedOnly, 1.0).unwrap();
        sequencer.wait().await;

        assert_eq!(sink.angles(), vec![10.0]);
        assert_eq!(sequencer.state(), PlaybackState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_from_selected() {
        let sink = RecordingSink::new();
        let mut sequencer = Sequencer::new(sink.clone());

        sequencer.select(Some(1));
        sequencer.play(&skill(3), PlayMode::FromSelected, 1.0).unwrap();
        sequencer.wait().await;
        assert_eq!(sink.angles(), vec![10.0, 20.0]);

        // 选中下标越界时从 0 开始
        sequencer.select(Some(9));
        sequencer.play(&skill(2), PlayMode::FromSelected, 1.0).unwrap();
        sequencer.wait().await;
        assert_eq!(sink.angles(), vec![10.0, 20.0, 0.0, 10.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_noops() {
        let sink = RecordingSink::new();
        let mut sequencer = Sequencer::new(sink.clone());

        assert!(!sequencer.play(&skill(0), PlayMode::All, 1.0).unwrap());

        assert!(sequencer.play(&skill(3), PlayMode::All, 1.0).unwrap());
        assert!(!sequencer.play(&skill(3), PlayMode::All, 1.0).unwrap());
        sequencer.stop();

        sink.connected.store(false, Ordering::Relaxed);
        assert!(!sequencer.play(&skill(3), PlayMode::All, 1.0).unwrap());
        assert_eq!(sequencer.state(), PlaybackState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_speed_rejected() {
        let mut sequencer = Sequencer::new(RecordingSink::new());
        for speed in [0.0, -1.0, 0.05, 5.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                sequencer.play(&skill(1), PlayMode::All, speed),
                Err(ClientError::InvalidSpeed(_))
            ));
        }
        assert_eq!(sequencer.state(), PlaybackState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_does_not_stop_playback() {
        let sink = RecordingSink::new();
        sink.fail.store(true, Ordering::Relaxed);
        let mut sequencer = Sequencer::new(sink.clone());

        sequencer.play(&skill(3), PlayMode::All, 1.0).unwrap();
        sequencer.wait().await;
        assert_eq!(sink.angles().len(), 3);
        assert_eq!(sequencer.state(), PlaybackState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactive_frame_skipped_but_timed() {
        let sink = RecordingSink::new();
        let mut sequencer = Sequencer::new(sink.clone());

        let mut s = skill(3);
        for servo in &mut s.frames[1].servos {
            servo.set_active(false);
        }
        sequencer.play(&s, PlayMode::All, 1.0).unwrap();
        sequencer.wait().await;

        assert_eq!(sink.angles(), vec![0.0, 20.0]);
        assert_eq!(sink.times(), vec![0, 200]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_playhead_updates() {
        let sink = RecordingSink::new();
        let mut sequencer = Sequencer::new(sink);
        let mut playhead = sequencer.subscribe_playhead();

        sequencer.play(&skill(2), PlayMode::All, 1.0).unwrap();

        playhead.changed().await.unwrap();
        assert_eq!(*playhead.borrow_and_update(), Some(0));
        playhead.changed().await.unwrap();
        assert_eq!(*playhead.borrow_and_update(), Some(1));
        playhead.changed().await.unwrap();
        assert_eq!(*playhead.borrow_and_update(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_wraps_and_sends() {
        let sink = RecordingSink::new();
        let mut sequencer = Sequencer::new(sink.clone());
        let s = skill(3);

        assert_eq!(sequencer.step(&s, StepDirection::Next).await.unwrap(), Some(0));
        assert_eq!(sequencer.step(&s, StepDirection::Prev).await.unwrap(), Some(2));
        assert_eq!(sequencer.step(&s, StepDirection::Next).await.unwrap(), Some(0));
        assert_eq!(sequencer.step(&s, StepDirection::Next).await.unwrap(), Some(1));
        assert_eq!(sink.angles(), vec![0.0, 20.0, 0.0, 10.0]);

        // 未连接：只移动选中
        sink.connected.store(false, Ordering::Relaxed);
        assert_eq!(sequencer.step(&s, StepDirection::Next).await.unwrap(), Some(2));
        assert_eq!(sink.angles().len(), 4);

        assert_eq!(sequencer.step(&skill(0), StepDirection::Next).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prev_from_nothing_selects_last() {
        let sink = RecordingSink::new();
        let mut sequencer = Sequencer::new(sink.clone());
        assert_eq!(
            sequencer.step(&skill(4), StepDirection::Prev).await.unwrap(),
            Some(3)
        );
        assert_eq!(sequencer.selected(), Some(3));
    }
}
