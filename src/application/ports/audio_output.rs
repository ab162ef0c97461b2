//! Audio Output Port - 单一音频输出通道

use thiserror::Error;

use crate::domain::AudioClip;

/// 音频输出错误
#[derive(Debug, Error)]
pub enum AudioOutputError {
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Playback error: {0}")]
    PlaybackError(String),
}

/// Audio Output Port
///
/// 同一时刻只连接一段音频；调用方保证 play 之前先 stop
pub trait AudioOutputPort: Send + Sync {
    /// 从头播放场景音频
    fn play(&self, scene_number: u32, clip: &AudioClip) -> Result<(), AudioOutputError>;

    /// 停止当前音频（没有音频在播放时为 no-op）
    fn stop(&self);
}
