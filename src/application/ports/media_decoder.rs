//! Media Decoder Port - 传输编码到可播放媒体的解码抽象

use thiserror::Error;

use crate::domain::{DecodedMedia, MediaKind};

/// 解码错误
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(String),

    #[error("Image decoding error: {0}")]
    ImageError(String),

    #[error("Audio decoding error: {0}")]
    AudioError(String),

    #[error("Empty payload")]
    EmptyPayload,

    #[error("Decoder panicked on malformed input")]
    Panicked,
}

/// Media Decoder Port
///
/// 同步接口，调用方负责放到阻塞线程上执行
pub trait MediaDecoderPort: Send + Sync {
    /// 解码一个 base64 媒体单元
    fn decode(&self, kind: MediaKind, payload: &str) -> Result<DecodedMedia, DecodeError>;
}
