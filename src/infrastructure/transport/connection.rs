//! WebSocket 连接公共部分: 建立连接、发送请求、读循环

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{TransportError, TransportEvent};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 入站事件通道容量
pub(crate) const INBOUND_CHANNEL_CAPACITY: usize = 256;

/// 建立连接并发送唯一一次请求
pub(crate) async fn connect_and_send(url: &str, body: String) -> Result<WsStream, TransportError> {
    let (mut stream, _response) = connect_async(url)
        .await
        .map_err(|e| TransportError::ConnectFailed(format!("{}: {}", url, e)))?;

    stream
        .send(Message::text(body))
        .await
        .map_err(|e| TransportError::SendFailed(e.to_string()))?;

    tracing::debug!(url = %url, "Generation request sent");
    Ok(stream)
}

/// 启动读任务
///
/// 文本帧经 parse 转换后转发；parse 返回 None 的帧被丢弃。
/// 取消时发送 Close 帧后退出，不再产生事件
pub(crate) fn spawn_reader<S, M, F>(
    label: &'static str,
    mut stream: WebSocketStream<S>,
    cancel: CancellationToken,
    tx: mpsc::Sender<TransportEvent<M>>,
    parse: F,
) -> JoinHandle<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    M: Send + 'static,
    F: Fn(&str) -> Option<M> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    if let Err(e) = stream.close(None).await {
                        tracing::debug!(socket = label, error = %e, "Close handshake failed");
                    }
                    return;
                }
                next = stream.next() => {
                    let event = match next {
                        Some(Ok(Message::Text(text))) => match parse(text.as_str()) {
                            Some(message) => TransportEvent::Message(message),
                            None => continue,
                        },
                        Some(Ok(Message::Binary(data))) => {
                            tracing::debug!(socket = label, bytes = data.len(), "Ignoring binary frame");
                            continue;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(socket = label, frame = ?frame, "Server closed connection");
                            TransportEvent::Closed
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            tracing::warn!(socket = label, error = %e, "WebSocket receive failed");
                            TransportEvent::Failed(TransportError::ReceiveFailed(e.to_string()))
                        }
                        None => TransportEvent::Closed,
                    };

                    let terminal = !matches!(event, TransportEvent::Message(_));
                    if tx.send(event).await.is_err() || terminal {
                        return;
                    }
                }
            }
        }
    })
}
