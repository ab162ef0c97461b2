//! Echo Player - 流式生成视频播放引擎
//!
//! 架构设计: Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - 帧/音频缓冲、播放状态机、缓冲门控、协议模型
//!
//! 应用层 (application/):
//! - Ports: 端口定义（StreamTransport, MediaDecoder, RenderTarget, AudioOutput）
//! - Session: 单次生成的会话 actor
//! - Player: 面向调用方的 start / stop / reset 门面
//!
//! 基础设施层 (infrastructure/):
//! - Transport: WebSocket 传输（统一协议与旧版双连接协议）
//! - Decoder: base64 图像/音频解码
//! - Output: 帧目录渲染目标、日志音频输出
//! - Events: 播放事件广播

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
mod test_support;

pub use application::{PlayerError, PlayerSnapshot, StreamPlayer};
pub use config::{load_config, AppConfig};
