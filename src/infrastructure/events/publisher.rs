//! Event Publisher Implementation
//!
//! 播放事件广播实现

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// 事件通道容量，逐帧事件较多，慢订阅者会收到 Lagged
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// 播放事件类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum PlayerEvent {
    /// 新会话开始
    SessionStarted { session_id: Uuid, prompt: String },
    /// 连接已建立，请求已发送
    Connected { session_id: Uuid },
    /// 缓冲门控打开，开始播放
    PlaybackStarted { session_id: Uuid },
    /// 帧已渲染
    FrameRendered {
        session_id: Uuid,
        frame_index: u32,
        scene_number: u32,
    },
    /// 帧已确定丢失
    FrameSkipped { session_id: Uuid, frame_index: u32 },
    /// 场景音频开始播放
    SceneAudioStarted {
        session_id: Uuid,
        scene_number: u32,
        late: bool,
    },
    /// 生成流水线完成
    PipelineComplete { session_id: Uuid },
    /// 播放完成
    PlaybackFinished {
        session_id: Uuid,
        frames_rendered: u64,
    },
    /// 流失败
    StreamFailed { session_id: Uuid, error: String },
}

impl PlayerEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            PlayerEvent::SessionStarted { session_id, .. }
            | PlayerEvent::Connected { session_id }
            | PlayerEvent::PlaybackStarted { session_id }
            | PlayerEvent::FrameRendered { session_id, .. }
            | PlayerEvent::FrameSkipped { session_id, .. }
            | PlayerEvent::SceneAudioStarted { session_id, .. }
            | PlayerEvent::PipelineComplete { session_id }
            | PlayerEvent::PlaybackFinished { session_id, .. }
            | PlayerEvent::StreamFailed { session_id, .. } => *session_id,
        }
    }
}

/// 事件发布器
pub struct EventPublisher {
    channel: broadcast::Sender<PlayerEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { channel: tx }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅播放事件
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.channel.subscribe()
    }

    pub fn publish_session_started(&self, session_id: Uuid, prompt: &str) {
        self.publish(PlayerEvent::SessionStarted {
            session_id,
            prompt: prompt.to_string(),
        });
    }

    pub fn publish_connected(&self, session_id: Uuid) {
        self.publish(PlayerEvent::Connected { session_id });
    }

    pub fn publish_playback_started(&self, session_id: Uuid) {
        self.publish(PlayerEvent::PlaybackStarted { session_id });
    }

    pub fn publish_frame_rendered(&self, session_id: Uuid, frame_index: u32, scene_number: u32) {
        self.publish(PlayerEvent::FrameRendered {
            session_id,
            frame_index,
            scene_number,
        });
    }

    pub fn publish_frame_skipped(&self, session_id: Uuid, frame_index: u32) {
        self.publish(PlayerEvent::FrameSkipped {
            session_id,
            frame_index,
        });
    }

    pub fn publish_scene_audio_started(&self, session_id: Uuid, scene_number: u32, late: bool) {
        self.publish(PlayerEvent::SceneAudioStarted {
            session_id,
            scene_number,
            late,
        });
    }

    pub fn publish_pipeline_complete(&self, session_id: Uuid) {
        self.publish(PlayerEvent::PipelineComplete { session_id });
    }

    pub fn publish_playback_finished(&self, session_id: Uuid, frames_rendered: u64) {
        self.publish(PlayerEvent::PlaybackFinished {
            session_id,
            frames_rendered,
        });
    }

    pub fn publish_stream_failed(&self, session_id: Uuid, error: &str) {
        self.publish(PlayerEvent::StreamFailed {
            session_id,
            error: error.to_string(),
        });
    }

    fn publish(&self, event: PlayerEvent) {
        if let Err(e) = self.channel.send(event) {
            tracing::trace!(error = %e, "Failed to publish event (no receivers)");
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
