//! Logging Audio Output - 只记录音频连接与断开的输出

use std::sync::Mutex;

use crate::application::ports::{AudioOutputError, AudioOutputPort};
use crate::domain::AudioClip;

/// 日志音频输出，不连接真实设备
#[derive(Default)]
pub struct LoggingAudioOutput {
    current: Mutex<Option<u32>>,
}

impl LoggingAudioOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前连接的场景
    pub fn current_scene(&self) -> Option<u32> {
        self.current.lock().ok().and_then(|current| *current)
    }
}

impl AudioOutputPort for LoggingAudioOutput {
    fn play(&self, scene_number: u32, clip: &AudioClip) -> Result<(), AudioOutputError> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| AudioOutputError::DeviceUnavailable("output state poisoned".to_string()))?;
        *current = Some(scene_number);
        tracing::info!(
            scene_number,
            sample_rate = clip.sample_rate(),
            channels = clip.channels(),
            duration_ms = clip.duration_ms(),
            "Playing scene audio"
        );
        Ok(())
    }

    fn stop(&self) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(scene_number) = current.take() {
                tracing::info!(scene_number, "Scene audio stopped");
            }
        }
    }
}
