//! Stream Transport Port - 双工连接抽象
//!
//! 定义生成流连接的抽象接口，具体实现在 infrastructure/transport 层

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::{GenerationRequest, ServerMessage};

/// 传输层错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// 连接上收到的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent<M = ServerMessage> {
    /// 一条已解析的消息
    Message(M),
    /// 对端正常关闭
    Closed,
    /// 连接异常
    Failed(TransportError),
}

/// 连接句柄
///
/// close 是幂等的：关闭已关闭或从未建立读任务的连接都是 no-op。
/// Drop 时同样会关闭连接
#[derive(Debug)]
pub struct ConnectionHandle {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ConnectionHandle {
    pub fn new(cancel: CancellationToken, tasks: Vec<JoinHandle<()>>) -> Self {
        Self { cancel, tasks }
    }

    /// 没有后台任务的句柄（测试或脚本化传输使用）
    pub fn detached() -> Self {
        Self::new(CancellationToken::new(), Vec::new())
    }

    pub fn close(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        tracing::debug!(tasks = self.tasks.len(), "Connection close requested");
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 关闭并等待读任务退出
    pub async fn shutdown(mut self) {
        self.close();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// 已建立的入站流
#[derive(Debug)]
pub struct InboundStream {
    pub events: mpsc::Receiver<TransportEvent>,
    pub connection: ConnectionHandle,
}

impl InboundStream {
    pub fn new(events: mpsc::Receiver<TransportEvent>, connection: ConnectionHandle) -> Self {
        Self { events, connection }
    }
}

/// Stream Transport Port
///
/// open 建立连接并发送唯一一次生成请求，之后连接只读
#[async_trait]
pub trait StreamTransportPort: Send + Sync {
    async fn open(&self, request: GenerationRequest) -> Result<InboundStream, TransportError>;

    /// 传输名称（用于日志）
    fn name(&self) -> &'static str;
}
