//! 工作台：串口会话 + 舵机链 + 序列目录 + 播放器
//!
//! 对应上位机的一次完整操作会话。所有修改舵机链或序列的操作都在这里完成，
//! 播放器只在 `play()` 时拿到序列快照。

use std::sync::Arc;

use luci_driver::Session;
use luci_protocol::{MAX_ROSTER_SIZE, ProtocolError, ServoKind, ServoState};
use luci_tools::{Skill, SkillCatalog};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::ClientError;
use crate::sequencer::{Sequencer, validate_speed};
use crate::state::{PlayMode, PlaybackState, StepDirection};

/// 默认播放速度
pub const DEFAULT_SPEED: f64 = 1.0;

pub struct Workbench {
    session: Arc<Session>,
    sequencer: Sequencer<Session>,
    servos: Vec<ServoState>,
    catalog: SkillCatalog,
    speed: f64,
    mode: PlayMode,
}

impl Workbench {
    pub fn new(session: Session, servos: Vec<ServoState>) -> Self {
        let session = Arc::new(session);
        Self {
            sequencer: Sequencer::new(session.clone()),
            session,
            servos,
            catalog: SkillCatalog::new(),
            speed: DEFAULT_SPEED,
            mode: PlayMode::default(),
        }
    }

    pub fn with_catalog(mut self, catalog: SkillCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    // ==================== 舵机链 ====================

    pub fn servos(&self) -> &[ServoState] {
        &self.servos
    }

    pub fn servo_mut(&mut self, index: usize) -> Result<&mut ServoState, ClientError> {
        self.servos.get_mut(index).ok_or(ClientError::ServoIndex(index))
    }

    /// 调整舵机数量：保留已有舵机，新增的按顺序编号
    pub fn set_servo_count(&mut self, count: usize, kind: ServoKind) -> Result<(), ClientError> {
        if count == 0 || count > MAX_ROSTER_SIZE {
            return Err(ProtocolError::InvalidServoCount(count).into());
        }
        if count <= self.servos.len() {
            self.servos.truncate(count);
        } else {
            for physical_id in self.servos.len() + 1..=count {
                self.servos.push(ServoState::new(physical_id as u8, kind)?);
            }
        }
        debug!(count, "Servo count changed");
        Ok(())
    }

    /// 发送整条舵机链的当前状态
    pub async fn send_current(&self) -> Result<usize, ClientError> {
        Ok(self.session.send_servos(&self.servos).await?)
    }

    /// 只发送一个舵机（忽略其启用状态）
    pub async fn send_servo(&self, index: usize) -> Result<(), ClientError> {
        let servo = self.servos.get(index).ok_or(ClientError::ServoIndex(index))?;
        Ok(self.session.send_single(servo).await?)
    }

    // ==================== 序列 ====================

    pub fn catalog(&self) -> &SkillCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut SkillCatalog {
        &mut self.catalog
    }

    /// 把当前舵机链追加为活动序列的新帧，并选中它
    pub fn capture_frame(&mut self) -> Result<String, ClientError> {
        let skill = self.catalog.active_mut().ok_or(ClientError::NoActiveSkill)?;
        let frame_id = skill.capture(&self.servos);
        let index = skill.len() - 1;
        self.sequencer.select(Some(index));
        Ok(frame_id)
    }

    pub fn set_looping(&mut self, looping: bool) -> Result<(), ClientError> {
        self.ensure_idle()?;
        self.catalog.set_looping(looping)?;
        Ok(())
    }

    // ==================== 播放 ====================

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f64) -> Result<(), ClientError> {
        self.ensure_idle()?;
        self.speed = validate_speed(speed)?;
        Ok(())
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PlayMode) {
        self.mode = mode;
    }

    pub fn selected(&self) -> Option<usize> {
        self.sequencer.selected()
    }

    pub fn select(&mut self, index: Option<usize>) {
        self.sequencer.select(index);
    }

    /// 没有活动序列时返回 `Ok(false)`
    pub fn play(&mut self) -> Result<bool, ClientError> {
        let Some(skill) = self.catalog.active() else {
            return Ok(false);
        };
        self.sequencer.play(skill, self.mode, self.speed)
    }

    pub fn pause(&self) -> bool {
        self.sequencer.pause()
    }

    pub fn resume(&self) -> bool {
        self.sequencer.resume()
    }

    pub fn stop(&self) -> bool {
        self.sequencer.stop()
    }

    pub async fn wait(&self) {
        self.sequencer.wait().await;
    }

    pub async fn step(&mut self, direction: StepDirection) -> Result<Option<usize>, ClientError> {
        match self.catalog.active() {
            Some(skill) => self.sequencer.step(skill, direction).await,
            None => Ok(None),
        }
    }

    /// 选中并发送指定帧
    pub async fn goto(&mut self, index: usize) -> Result<bool, ClientError> {
        match self.catalog.active() {
            Some(skill) => self.sequencer.goto(skill, index).await,
            None => Ok(false),
        }
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.sequencer.state()
    }

    pub fn playhead(&self) -> Option<usize> {
        self.sequencer.playhead()
    }

    pub fn subscribe_playhead(&self) -> watch::Receiver<Option<usize>> {
        self.sequencer.subscribe_playhead()
    }

    pub fn active_skill(&self) -> Option<&Skill> {
        self.catalog.active()
    }

    /// 停止播放并关闭会话（先停读取，再释放串口）
    pub async fn disconnect(&self) {
        self.sequencer.stop();
        self.session.close().await;
        info!("Workbench disconnected");
    }

    fn ensure_idle(&self) -> Result<(), ClientError> {
        if self.sequencer.state().is_active() {
            return Err(ClientError::PlaybackActive);
        }
        Ok(())
    }
}
