//! Legacy WebSocket Transport - 视频、音频双连接协议
//!
//! 两条连接各发送一次同样的请求，入站消息归一化为统一的 ServerMessage 流:
//! - 视频连接: frame（无场景号，由切换帧索引推导）、video_complete
//! - 音频连接: scene_audio、audio_complete
//!
//! 两条连接都完成后合成 pipeline_complete

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::connection::{connect_and_send, spawn_reader, INBOUND_CHANNEL_CAPACITY};
use crate::application::ports::{
    ConnectionHandle, InboundStream, StreamTransportPort, TransportError, TransportEvent,
};
use crate::domain::{scene_for_frame, GenerationRequest, ServerMessage};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum VideoMessage {
    Frame { frame_index: u32, data: String },
    VideoComplete { total_frames: u32 },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AudioMessage {
    SceneAudio {
        scene_number: u32,
        audio_data: String,
    },
    AudioComplete,
    #[serde(other)]
    Unknown,
}

fn parse_json<M: for<'de> Deserialize<'de>>(socket: &'static str) -> impl Fn(&str) -> Option<M> {
    move |text| match serde_json::from_str(text) {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::warn!(socket, error = %e, "Ignoring malformed server message");
            None
        }
    }
}

/// 双连接 WebSocket 传输
pub struct LegacyWsTransport {
    video_url: String,
    audio_url: String,
}

impl LegacyWsTransport {
    pub fn new(video_url: impl Into<String>, audio_url: impl Into<String>) -> Self {
        Self {
            video_url: video_url.into(),
            audio_url: audio_url.into(),
        }
    }
}

#[async_trait]
impl StreamTransportPort for LegacyWsTransport {
    async fn open(&self, request: GenerationRequest) -> Result<InboundStream, TransportError> {
        let GenerationRequest::Legacy {
            switch_frame_indices,
            ..
        } = &request
        else {
            return Err(TransportError::Protocol(
                "unified request sent to legacy transport".to_string(),
            ));
        };
        let switch_frame_indices = switch_frame_indices.clone();
        let body =
            serde_json::to_string(&request).map_err(|e| TransportError::Protocol(e.to_string()))?;

        let video = connect_and_send(&self.video_url, body.clone()).await?;
        let audio = connect_and_send(&self.audio_url, body).await?;
        tracing::info!(
            video_url = %self.video_url,
            audio_url = %self.audio_url,
            "Connected to legacy generation servers"
        );

        let cancel = CancellationToken::new();
        let (video_tx, video_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        let (audio_tx, audio_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        let (tx, rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);

        let video_reader = spawn_reader(
            "video",
            video,
            cancel.clone(),
            video_tx,
            parse_json::<VideoMessage>("video"),
        );
        let audio_reader = spawn_reader(
            "audio",
            audio,
            cancel.clone(),
            audio_tx,
            parse_json::<AudioMessage>("audio"),
        );
        let merger = tokio::spawn(merge(
            video_rx,
            audio_rx,
            switch_frame_indices,
            tx,
            cancel.clone(),
        ));

        Ok(InboundStream::new(
            rx,
            ConnectionHandle::new(cancel, vec![video_reader, audio_reader, merger]),
        ))
    }

    fn name(&self) -> &'static str {
        "legacy-websocket"
    }
}

#[derive(Default)]
struct MergeState {
    video_open: bool,
    audio_open: bool,
    video_done: bool,
    audio_done: bool,
    pipeline_sent: bool,
}

/// 合并两条连接的事件
///
/// 任一连接在自己的完成消息之前结束都转发为 Failed 并停止合并
async fn merge(
    mut video: mpsc::Receiver<TransportEvent<VideoMessage>>,
    mut audio: mpsc::Receiver<TransportEvent<AudioMessage>>,
    switch_frame_indices: Vec<u32>,
    tx: mpsc::Sender<TransportEvent>,
    cancel: CancellationToken,
) {
    let mut state = MergeState {
        video_open: true,
        audio_open: true,
        ..Default::default()
    };

    loop {
        let forwarded = tokio::select! {
            _ = cancel.cancelled() => return,
            event = video.recv(), if state.video_open => match event {
                Some(TransportEvent::Message(VideoMessage::Frame { frame_index, data })) => {
                    Some(TransportEvent::Message(ServerMessage::Frame {
                        frame_index,
                        scene_number: scene_for_frame(&switch_frame_indices, frame_index),
                        data,
                    }))
                }
                Some(TransportEvent::Message(VideoMessage::VideoComplete { total_frames })) => {
                    state.video_done = true;
                    Some(TransportEvent::Message(ServerMessage::VideoComplete { total_frames }))
                }
                Some(TransportEvent::Message(VideoMessage::Unknown)) => {
                    tracing::debug!(socket = "video", "Ignoring unknown message type");
                    None
                }
                Some(TransportEvent::Failed(e)) if !state.video_done => {
                    Some(TransportEvent::Failed(e))
                }
                Some(TransportEvent::Closed) | None if !state.video_done => {
                    Some(TransportEvent::Failed(TransportError::ReceiveFailed(
                        "video socket closed before video_complete".to_string(),
                    )))
                }
                Some(TransportEvent::Failed(_)) | Some(TransportEvent::Closed) | None => {
                    state.video_open = false;
                    None
                }
            },
            event = audio.recv(), if state.audio_open => match event {
                Some(TransportEvent::Message(AudioMessage::SceneAudio { scene_number, audio_data })) => {
                    Some(TransportEvent::Message(ServerMessage::SceneAudio {
                        scene_number,
                        audio_data,
                    }))
                }
                Some(TransportEvent::Message(AudioMessage::AudioComplete)) => {
                    tracing::info!("Legacy audio stream complete");
                    state.audio_done = true;
                    None
                }
                Some(TransportEvent::Message(AudioMessage::Unknown)) => {
                    tracing::debug!(socket = "audio", "Ignoring unknown message type");
                    None
                }
                Some(TransportEvent::Failed(e)) if !state.audio_done => {
                    Some(TransportEvent::Failed(e))
                }
                Some(TransportEvent::Closed) | None if !state.audio_done => {
                    Some(TransportEvent::Failed(TransportError::ReceiveFailed(
                        "audio socket closed before audio_complete".to_string(),
                    )))
                }
                Some(TransportEvent::Failed(_)) | Some(TransportEvent::Closed) | None => {
                    state.audio_open = false;
                    None
                }
            },
        };

        if let Some(event) = forwarded {
            let failed = matches!(event, TransportEvent::Failed(_));
            if tx.send(event).await.is_err() || failed {
                return;
            }
        }

        if state.video_done && state.audio_done && !state.pipeline_sent {
            state.pipeline_sent = true;
            if tx
                .send(TransportEvent::Message(ServerMessage::PipelineComplete))
                .await
                .is_err()
            {
                return;
            }
        }

        if !state.video_open && !state.audio_open {
            let _ = tx.send(TransportEvent::Closed).await;
            return;
        }
    }
}
