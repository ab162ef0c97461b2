//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod decoder;
pub mod events;
pub mod output;
pub mod transport;

pub use decoder::Base64MediaDecoder;
pub use events::{EventPublisher, PlayerEvent};
pub use output::{FrameDirRenderTarget, LoggingAudioOutput};
pub use transport::{LegacyWsTransport, WsTransport};
