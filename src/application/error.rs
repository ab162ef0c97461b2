//! 应用层错误定义
//!
//! start() 只返回启动前的参数错误；传输失败通过事件和快照报告，
//! 单个媒体单元的问题都在会话内部吸收

use thiserror::Error;

/// 播放器错误
#[derive(Debug, Error)]
pub enum PlayerError {
    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 未绑定渲染目标就启动播放
    #[error("No render target bound")]
    RenderTargetUnbound,
}

impl PlayerError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}
