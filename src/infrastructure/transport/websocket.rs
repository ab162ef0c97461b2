//! Unified WebSocket Transport - 单连接协议

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::connection::{connect_and_send, spawn_reader, INBOUND_CHANNEL_CAPACITY};
use crate::application::ports::{
    ConnectionHandle, InboundStream, StreamTransportPort, TransportError,
};
use crate::domain::{GenerationRequest, ServerMessage};

/// 单连接 WebSocket 传输
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// 解析服务端文本帧，格式错误的帧记录后丢弃
pub(crate) fn parse_server_message(text: &str) -> Option<ServerMessage> {
    match ServerMessage::parse(text) {
        Ok(message) => {
            tracing::trace!(message_type = message.type_name(), "Message received");
            Some(message)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed server message");
            None
        }
    }
}

#[async_trait]
impl StreamTransportPort for WsTransport {
    async fn open(&self, request: GenerationRequest) -> Result<InboundStream, TransportError> {
        if request.is_legacy() {
            return Err(TransportError::Protocol(
                "legacy request sent to unified transport".to_string(),
            ));
        }
        let body =
            serde_json::to_string(&request).map_err(|e| TransportError::Protocol(e.to_string()))?;

        let stream = connect_and_send(&self.url, body).await?;
        tracing::info!(url = %self.url, "Connected to generation server");

        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        let reader = spawn_reader("unified", stream, cancel.clone(), tx, parse_server_message);

        Ok(InboundStream::new(rx, ConnectionHandle::new(cancel, vec![reader])))
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}
