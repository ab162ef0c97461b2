//! Media Units - 解码后的可播放媒体单元

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 传输层声明的媒体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// 已解码的视频帧
///
/// 内部图像通过 Arc 共享，克隆开销只是一次引用计数
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    image: Arc<RgbaImage>,
}

impl DecodedFrame {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// 已解码的场景音频
///
/// 样本为交错排列的 f32，采样率固定为解码器配置的输出采样率
#[derive(Debug, Clone)]
pub struct AudioClip {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            channels: channels.max(1),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// 每声道的样本帧数
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// 时长（毫秒）
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.frame_count() as u64 * 1000) / self.sample_rate as u64
    }
}

/// 解码结果
#[derive(Debug, Clone)]
pub enum DecodedMedia {
    Frame(DecodedFrame),
    Audio(AudioClip),
}

impl DecodedMedia {
    pub fn kind(&self) -> MediaKind {
        match self {
            DecodedMedia::Frame(_) => MediaKind::Image,
            DecodedMedia::Audio(_) => MediaKind::Audio,
        }
    }
}
