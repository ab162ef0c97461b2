//! Stream Session - 单次生成的会话
//!
//! 每个会话由一个 actor 任务独占全部状态（缓冲、完成标记、播放头、门控、音频通道），
//! 通过 CancellationToken 取消。旧会话的任何结果都不会落入新会话

mod actor;
mod audio_channel;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::player::PlayerSnapshot;
use crate::application::ports::{
    AudioOutputPort, MediaDecoderPort, RenderTargetPort, StreamTransportPort,
};
use crate::config::{AppConfig, StreamProtocol};
use crate::domain::{CompletionFlags, GatePolicy, GenerationRequest};
use crate::infrastructure::events::EventPublisher;

pub use audio_channel::AudioChannel;

pub(crate) use actor::SessionActor;

/// 会话（一次生成请求）
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub flags: CompletionFlags,
}

impl Session {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            created_at: Utc::now(),
            flags: CompletionFlags::default(),
        }
    }
}

/// 请求模板，按协议生成请求体
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTemplate {
    Unified {
        fps: u32,
        num_scenes: u32,
    },
    Legacy {
        blocks_per_chunk: u32,
        switch_frame_indices: Vec<u32>,
    },
}

impl RequestTemplate {
    pub fn build(&self, prompt: &str) -> GenerationRequest {
        match self {
            RequestTemplate::Unified { fps, num_scenes } => {
                GenerationRequest::unified(prompt, *fps, *num_scenes)
            }
            RequestTemplate::Legacy {
                blocks_per_chunk,
                switch_frame_indices,
            } => GenerationRequest::legacy(prompt, *blocks_per_chunk, switch_frame_indices.clone()),
        }
    }
}

/// 会话配置
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub request: RequestTemplate,
    pub fps: u32,
    pub gate_policy: GatePolicy,
    pub warmup: Duration,
}

impl SessionConfig {
    /// tick 周期 = 1000 / fps 毫秒
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request: RequestTemplate::Unified {
                fps: 16,
                num_scenes: 5,
            },
            fps: 16,
            gate_policy: GatePolicy::SceneComplete,
            warmup: Duration::from_millis(3000),
        }
    }
}

impl From<&AppConfig> for SessionConfig {
    fn from(config: &AppConfig) -> Self {
        let stream = &config.stream;
        let (request, gate_policy) = match stream.protocol {
            StreamProtocol::Unified => (
                RequestTemplate::Unified {
                    fps: stream.fps,
                    num_scenes: stream.num_scenes,
                },
                config.playback.gate,
            ),
            // legacy 协议没有 scene_complete，只能按预热时长启动
            StreamProtocol::Legacy => {
                if config.playback.gate != GatePolicy::Warmup {
                    tracing::warn!(
                        configured = %config.playback.gate,
                        "Legacy protocol has no scene_complete signal, using warmup gate"
                    );
                }
                (
                    RequestTemplate::Legacy {
                        blocks_per_chunk: stream.legacy.blocks_per_chunk,
                        switch_frame_indices: stream.legacy.switch_frame_indices.clone(),
                    },
                    GatePolicy::Warmup,
                )
            }
        };

        Self {
            request,
            fps: stream.fps,
            gate_policy,
            warmup: Duration::from_millis(config.playback.warmup_ms),
        }
    }
}

/// 会话依赖的端口与共享状态
#[derive(Clone)]
pub(crate) struct SessionContext {
    pub transport: Arc<dyn StreamTransportPort>,
    pub decoder: Arc<dyn MediaDecoderPort>,
    pub render_target: Arc<dyn RenderTargetPort>,
    pub audio_output: Arc<dyn AudioOutputPort>,
    pub events: Arc<EventPublisher>,
    pub snapshot: Arc<watch::Sender<PlayerSnapshot>>,
}

/// 运行中会话的句柄
pub(crate) struct SessionHandle {
    id: Uuid,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// 启动会话 actor
    pub fn spawn(session: Session, config: SessionConfig, ctx: SessionContext) -> Self {
        let id = session.id;
        let cancel = CancellationToken::new();
        let actor = SessionActor::new(session, config, ctx, cancel.clone());
        let task = tokio::spawn(actor.run());
        Self { id, cancel, task }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// 只发出取消信号，不等待
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// 取消并等待 actor 退出
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            if e.is_panic() {
                tracing::error!(session_id = %self.id, "Session task panicked");
            }
        }
    }
}
