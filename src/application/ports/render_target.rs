//! Render Target Port - 帧呈现目标

use thiserror::Error;

use crate::domain::DecodedFrame;

/// 渲染错误
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Render target unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Render Target Port
///
/// 呈现当前帧；未被调用时目标保持上一帧
pub trait RenderTargetPort: Send + Sync {
    fn present(&self, frame_index: u32, frame: &DecodedFrame) -> Result<(), RenderError>;
}
