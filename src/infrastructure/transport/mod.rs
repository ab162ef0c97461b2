//! WebSocket 传输实现

mod connection;
mod legacy;
mod websocket;

pub use legacy::LegacyWsTransport;
pub use websocket::WsTransport;
