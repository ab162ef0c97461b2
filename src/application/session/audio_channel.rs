//! Audio Channel - 单一音频输出通道的占用管理

use std::sync::Arc;

use crate::application::ports::{AudioOutputError, AudioOutputPort};
use crate::domain::AudioClip;

/// 音频通道
///
/// 不变量: 任意时刻至多一段场景音频连接到输出，启动新音频前总是先停止旧音频
pub struct AudioChannel {
    output: Arc<dyn AudioOutputPort>,
    active: Option<u32>,
}

impl AudioChannel {
    pub fn new(output: Arc<dyn AudioOutputPort>) -> Self {
        Self {
            output,
            active: None,
        }
    }

    /// 当前连接的场景
    pub fn active_scene(&self) -> Option<u32> {
        self.active
    }

    /// 从头播放场景音频
    pub fn start(&mut self, scene_number: u32, clip: &AudioClip) -> Result<(), AudioOutputError> {
        self.stop();
        self.output.play(scene_number, clip)?;
        self.active = Some(scene_number);
        tracing::debug!(
            scene_number,
            duration_ms = clip.duration_ms(),
            "Scene audio connected"
        );
        Ok(())
    }

    /// 停止当前音频（幂等）
    pub fn stop(&mut self) {
        if let Some(scene_number) = self.active.take() {
            self.output.stop();
            tracing::debug!(scene_number, "Scene audio stopped");
        }
    }
}
