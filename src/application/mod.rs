//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（StreamTransport、MediaDecoder、RenderTarget、AudioOutput）
//! - session: 单次生成的会话 actor
//! - player: 面向调用方的播放门面
//! - error: 应用层错误定义

pub mod error;
pub mod player;
pub mod ports;
pub mod session;

pub use error::PlayerError;
pub use player::{PlayerSnapshot, StreamPlayer};
pub use session::{RequestTemplate, Session, SessionConfig};

pub use ports::{
    AudioOutputError, AudioOutputPort, ConnectionHandle, DecodeError, InboundStream,
    MediaDecoderPort, RenderError, RenderTargetPort, StreamTransportPort, TransportError,
    TransportEvent,
};
