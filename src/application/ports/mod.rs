//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_output;
mod media_decoder;
mod render_target;
mod stream_transport;

pub use audio_output::{AudioOutputError, AudioOutputPort};
pub use media_decoder::{DecodeError, MediaDecoderPort};
pub use render_target::{RenderError, RenderTargetPort};
pub use stream_transport::{
    ConnectionHandle, InboundStream, StreamTransportPort, TransportError, TransportEvent,
};
