//! 测试用端口替身

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    AudioOutputError, AudioOutputPort, ConnectionHandle, DecodeError, InboundStream,
    MediaDecoderPort, RenderError, RenderTargetPort, StreamTransportPort, TransportError,
    TransportEvent,
};
use crate::domain::{AudioClip, DecodedFrame, DecodedMedia, GenerationRequest, MediaKind, ServerMessage};

/// 脚本步骤
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Send(ServerMessage),
    Wait(Duration),
    Close,
    Fail(TransportError),
    /// 保持连接直到被关闭
    Hang,
}

/// 帧消息，data 编码标记值
pub fn frame_msg(frame_index: u32, scene_number: u32, marker: u8) -> ScriptStep {
    ScriptStep::Send(ServerMessage::Frame {
        frame_index,
        scene_number,
        data: marker.to_string(),
    })
}

pub fn audio_msg(scene_number: u32, marker: u8) -> ScriptStep {
    ScriptStep::Send(ServerMessage::SceneAudio {
        scene_number,
        audio_data: marker.to_string(),
    })
}

/// 按脚本回放服务端消息的传输，每次 open 消耗一个脚本
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Vec<ScriptStep>>>,
    open_error: Option<TransportError>,
    requests: Mutex<Vec<GenerationRequest>>,
    connections: Mutex<Vec<CancellationToken>>,
}

impl ScriptedTransport {
    pub fn new(scripts: Vec<Vec<ScriptStep>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            open_error: None,
            requests: Mutex::new(Vec::new()),
            connections: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: TransportError) -> Self {
        Self {
            open_error: Some(error),
            ..Self::new(Vec::new())
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    pub fn closed_count(&self) -> usize {
        self.connections
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.is_cancelled())
            .count()
    }
}

#[async_trait]
impl StreamTransportPort for ScriptedTransport {
    async fn open(&self, request: GenerationRequest) -> Result<InboundStream, TransportError> {
        self.requests.lock().unwrap().push(request);
        if let Some(error) = &self.open_error {
            return Err(error.clone());
        }

        let script = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        let cancel = CancellationToken::new();
        self.connections.lock().unwrap().push(cancel.clone());

        let (tx, rx) = mpsc::channel(256);
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            for step in script {
                match step {
                    ScriptStep::Send(message) => {
                        if tx.send(TransportEvent::Message(message)).await.is_err() {
                            return;
                        }
                    }
                    ScriptStep::Wait(duration) => {
                        tokio::select! {
                            _ = token.cancelled() => return,
                            _ = tokio::time::sleep(duration) => {}
                        }
                    }
                    ScriptStep::Close => {
                        let _ = tx.send(TransportEvent::Closed).await;
                        return;
                    }
                    ScriptStep::Fail(error) => {
                        let _ = tx.send(TransportEvent::Failed(error)).await;
                        return;
                    }
                    ScriptStep::Hang => {
                        token.cancelled().await;
                        return;
                    }
                }
            }
            token.cancelled().await;
        });

        Ok(InboundStream::new(rx, ConnectionHandle::new(cancel, vec![task])))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// 桩解码器
///
/// 图像: data 为标记值（可加 "slow:" 前缀模拟慢解码），输出 1x1 像素，红色通道为标记值。
/// 音频: data 为标记值，输出单声道 16 kHz 的 0.5 秒音频
pub struct StubDecoder;

impl MediaDecoderPort for StubDecoder {
    fn decode(&self, kind: MediaKind, payload: &str) -> Result<DecodedMedia, DecodeError> {
        let marker = match payload.strip_prefix("slow:") {
            Some(rest) => {
                std::thread::sleep(Duration::from_millis(50));
                rest
            }
            None => payload,
        };
        let marker: u8 = marker
            .parse()
            .map_err(|_| DecodeError::InvalidBase64(payload.to_string()))?;

        match kind {
            MediaKind::Image => {
                let image = RgbaImage::from_pixel(1, 1, Rgba([marker, 0, 0, 255]));
                Ok(DecodedMedia::Frame(DecodedFrame::new(image)))
            }
            MediaKind::Audio => Ok(DecodedMedia::Audio(AudioClip::new(
                vec![f32::from(marker); 8000],
                16000,
                1,
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presented {
    pub frame_index: u32,
    pub marker: u8,
    pub at: Instant,
}

#[derive(Default)]
pub struct RecordingRenderTarget {
    presented: Mutex<Vec<Presented>>,
}

impl RecordingRenderTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> Vec<Presented> {
        self.presented.lock().unwrap().clone()
    }
}

impl RenderTargetPort for RecordingRenderTarget {
    fn present(&self, frame_index: u32, frame: &DecodedFrame) -> Result<(), RenderError> {
        let marker = frame.image().get_pixel(0, 0).0[0];
        self.presented.lock().unwrap().push(Presented {
            frame_index,
            marker,
            at: Instant::now(),
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCall {
    Play(u32),
    Stop,
}

#[derive(Default)]
struct AudioState {
    calls: Vec<AudioCall>,
    playing: usize,
    max_concurrent: usize,
}

/// 记录调用并统计同时连接的音频数
#[derive(Default)]
pub struct RecordingAudioOutput {
    state: Mutex<AudioState>,
}

impl RecordingAudioOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<AudioCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn max_concurrent(&self) -> usize {
        self.state.lock().unwrap().max_concurrent
    }
}

impl AudioOutputPort for RecordingAudioOutput {
    fn play(&self, scene_number: u32, _clip: &AudioClip) -> Result<(), AudioOutputError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(AudioCall::Play(scene_number));
        state.playing += 1;
        state.max_concurrent = state.max_concurrent.max(state.playing);
        Ok(())
    }

    fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(AudioCall::Stop);
        state.playing = 0;
    }
}
