//! Session Actor - 会话状态的唯一所有者
//!
//! 通过 select! 复用: 取消信号、传输事件、解码完成、预热计时器与播放 tick

use std::future::pending;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;

use tokio::task::{JoinError, JoinSet};
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::audio_channel::AudioChannel;
use super::{Session, SessionConfig, SessionContext};
use crate::application::player::PlayerSnapshot;
use crate::application::ports::{ConnectionHandle, DecodeError, TransportError, TransportEvent};
use crate::domain::{
    AudioBuffer, AudioCue, BufferingGate, DecodedMedia, FrameBuffer, FrameEntry, GateTrigger,
    MediaKind, PlaybackState, Playhead, SceneInfo, ServerMessage, StreamStatus, TickStep,
};

/// 解码结果的归属
#[derive(Debug, Clone, Copy)]
enum DecodeTarget {
    Frame { frame_index: u32, scene_number: u32 },
    Audio { scene_number: u32 },
}

#[derive(Debug)]
struct DecodeOutcome {
    session_id: Uuid,
    target: DecodeTarget,
    result: Result<DecodedMedia, DecodeError>,
}

pub(crate) struct SessionActor {
    session: Session,
    config: SessionConfig,
    ctx: SessionContext,
    cancel: CancellationToken,
    frames: FrameBuffer,
    audio: AudioBuffer,
    playhead: Playhead,
    gate: BufferingGate,
    channel: AudioChannel,
    decodes: JoinSet<DecodeOutcome>,
    frames_rendered: u64,
}

impl SessionActor {
    pub fn new(
        session: Session,
        config: SessionConfig,
        ctx: SessionContext,
        cancel: CancellationToken,
    ) -> Self {
        let gate = BufferingGate::new(config.gate_policy, config.warmup);
        let channel = AudioChannel::new(ctx.audio_output.clone());
        Self {
            session,
            config,
            ctx,
            cancel,
            frames: FrameBuffer::new(),
            audio: AudioBuffer::new(),
            playhead: Playhead::new(),
            gate,
            channel,
            decodes: JoinSet::new(),
            frames_rendered: 0,
        }
    }

    pub async fn run(mut self) {
        let session_id = self.session.id;
        let request = self.config.request.build(&self.session.prompt);

        self.playhead.begin_buffering();
        self.update_snapshot(|s| s.playback = PlaybackState::Buffering);

        tracing::info!(
            session_id = %session_id,
            transport = self.ctx.transport.name(),
            gate = %self.gate.policy(),
            fps = self.config.fps,
            "Opening generation stream"
        );

        let opened = tokio::select! {
            _ = self.cancel.cancelled() => None,
            result = self.ctx.transport.open(request) => Some(result),
        };

        let mut inbound = match opened {
            None => {
                self.finish(None);
                return;
            }
            Some(Ok(inbound)) => inbound,
            Some(Err(e)) => {
                tracing::error!(session_id = %session_id, error = %e, "Failed to open generation stream");
                self.report_failure(&e);
                self.finish(None);
                return;
            }
        };

        tracing::info!(session_id = %session_id, "Generation stream connected");
        self.ctx.events.publish_connected(session_id);
        self.update_snapshot(|s| {
            s.status = StreamStatus::Generating;
            s.current_scene = None;
        });

        // 预热从请求发出时开始计时
        let mut warmup: Option<Pin<Box<Sleep>>> = self
            .gate
            .warmup()
            .map(|duration| Box::pin(tokio::time::sleep(duration)));
        let mut ticker: Option<Interval> = None;
        let mut inbound_open = true;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::debug!(session_id = %session_id, "Session cancelled");
                    break;
                }
                _ = next_tick(&mut ticker) => {
                    self.on_tick();
                }
                Some(joined) = self.decodes.join_next(), if !self.decodes.is_empty() => {
                    self.on_decoded(joined);
                }
                event = inbound.events.recv(), if inbound_open => {
                    match event {
                        Some(TransportEvent::Message(message)) => {
                            if let Some(started) = self.on_message(message) {
                                ticker = Some(started);
                            }
                        }
                        Some(TransportEvent::Closed) | None => {
                            inbound_open = false;
                            self.on_transport_ended(None);
                        }
                        Some(TransportEvent::Failed(e)) => {
                            inbound_open = false;
                            self.on_transport_ended(Some(e));
                        }
                    }
                }
                _ = warmup_elapsed(&mut warmup) => {
                    warmup = None;
                    if let Some(started) = self.begin_playback(GateTrigger::WarmupElapsed) {
                        ticker = Some(started);
                    }
                }
            }

            if self.playhead.state() == PlaybackState::Stopped {
                break;
            }
        }

        self.finish(Some(inbound.connection));
    }

    fn on_message(&mut self, message: ServerMessage) -> Option<Interval> {
        let session_id = self.session.id;
        match message {
            ServerMessage::SceneInfo {
                scene_number,
                title,
                description,
            } => {
                tracing::info!(session_id = %session_id, scene_number, title = %title, "Generating scene");
                self.update_snapshot(|s| {
                    s.is_generating = true;
                    s.current_scene = Some(SceneInfo {
                        scene_number,
                        title,
                        description,
                    });
                });
                None
            }
            ServerMessage::Frame {
                frame_index,
                scene_number,
                data,
            } => {
                self.frames.mark_pending(frame_index);
                self.spawn_decode(
                    DecodeTarget::Frame {
                        frame_index,
                        scene_number,
                    },
                    MediaKind::Image,
                    data,
                );
                None
            }
            ServerMessage::SceneAudio {
                scene_number,
                audio_data,
            } => {
                self.spawn_decode(
                    DecodeTarget::Audio { scene_number },
                    MediaKind::Audio,
                    audio_data,
                );
                None
            }
            ServerMessage::SceneComplete { scene_number } => {
                tracing::info!(session_id = %session_id, scene_number = ?scene_number, "Scene complete");
                self.update_snapshot(|s| {
                    s.is_generating = false;
                    s.current_scene = None;
                });
                self.begin_playback(GateTrigger::SceneComplete)
            }
            ServerMessage::VideoComplete { total_frames } => {
                tracing::info!(session_id = %session_id, total_frames, "Video generation complete");
                self.session.flags.mark_video_complete(total_frames);
                None
            }
            ServerMessage::PipelineComplete => {
                tracing::info!(session_id = %session_id, "Generation pipeline complete");
                self.session.flags.mark_pipeline_complete();
                self.ctx.events.publish_pipeline_complete(session_id);
                self.update_snapshot(|s| {
                    s.is_generating = false;
                    s.status = StreamStatus::GenerationComplete;
                });
                None
            }
            ServerMessage::Unknown => {
                tracing::debug!(session_id = %session_id, "Ignoring unknown message type");
                None
            }
        }
    }

    fn spawn_decode(&mut self, target: DecodeTarget, kind: MediaKind, payload: String) {
        let decoder = self.ctx.decoder.clone();
        let session_id = self.session.id;
        self.decodes.spawn_blocking(move || {
            // 损坏的输入不能拖垮会话，panic 视为一次解码失败
            let result = catch_unwind(AssertUnwindSafe(|| decoder.decode(kind, &payload)))
                .unwrap_or_else(|_| Err(DecodeError::Panicked));
            DecodeOutcome {
                session_id,
                target,
                result,
            }
        });
    }

    fn on_decoded(&mut self, joined: Result<DecodeOutcome, JoinError>) {
        let session_id = self.session.id;
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Decode task did not complete");
                return;
            }
        };

        if outcome.session_id != session_id {
            tracing::warn!(
                session_id = %session_id,
                stale_session = %outcome.session_id,
                "Dropping decode result from another session"
            );
            return;
        }

        match (outcome.target, outcome.result) {
            (
                DecodeTarget::Frame {
                    frame_index,
                    scene_number,
                },
                Ok(DecodedMedia::Frame(frame)),
            ) => {
                self.frames.insert(
                    frame_index,
                    FrameEntry {
                        frame,
                        scene_number,
                    },
                );
            }
            (DecodeTarget::Audio { scene_number }, Ok(DecodedMedia::Audio(clip))) => {
                tracing::info!(
                    session_id = %session_id,
                    scene_number,
                    duration_ms = clip.duration_ms(),
                    "Scene audio buffered"
                );
                self.audio.insert(scene_number, clip);
            }
            (DecodeTarget::Frame { frame_index, .. }, result) => {
                self.frames.abandon(frame_index);
                match result {
                    Err(e) => tracing::warn!(session_id = %session_id, frame_index, error = %e, "Dropping undecodable frame"),
                    Ok(other) => tracing::warn!(session_id = %session_id, frame_index, kind = ?other.kind(), "Frame decoded to unexpected media kind"),
                }
            }
            (DecodeTarget::Audio { scene_number }, result) => match result {
                Err(e) => tracing::warn!(session_id = %session_id, scene_number, error = %e, "Dropping undecodable scene audio"),
                Ok(other) => tracing::warn!(session_id = %session_id, scene_number, kind = ?other.kind(), "Audio decoded to unexpected media kind"),
            },
        }
    }

    fn begin_playback(&mut self, trigger: GateTrigger) -> Option<Interval> {
        if !self.gate.offer(trigger) {
            return None;
        }
        if !self.playhead.start() {
            tracing::debug!(session_id = %self.session.id, "Playback already running");
            return None;
        }

        tracing::info!(
            session_id = %self.session.id,
            trigger = ?trigger,
            buffered_frames = self.frames.len(),
            contiguous = self.frames.contiguous_len(),
            "Buffering gate opened, starting playback"
        );
        self.ctx.events.publish_playback_started(self.session.id);
        self.update_snapshot(|s| {
            s.playback = PlaybackState::Playing;
            s.status = StreamStatus::Playing;
        });

        let mut ticker = tokio::time::interval(self.config.frame_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Some(ticker)
    }

    fn on_tick(&mut self) {
        let session_id = self.session.id;
        let report = self
            .playhead
            .tick(&self.frames, &self.audio, &self.session.flags);

        match report.audio {
            AudioCue::Keep => {}
            AudioCue::Switch {
                scene_number,
                available,
            } => {
                self.channel.stop();
                if available {
                    self.start_scene_audio(scene_number, false);
                } else {
                    tracing::debug!(session_id = %session_id, scene_number, "Scene audio not buffered yet, playing silently");
                }
            }
            AudioCue::LateStart { scene_number } => {
                self.start_scene_audio(scene_number, true);
            }
        }

        match report.step {
            TickStep::Inactive => {}
            TickStep::Rendered {
                frame_index,
                scene_number,
            } => {
                if let Some(entry) = self.frames.get(frame_index) {
                    // 单帧渲染失败只记录，帧仍视为已呈现
                    if let Err(e) = self.ctx.render_target.present(frame_index, &entry.frame) {
                        tracing::warn!(session_id = %session_id, frame_index, error = %e, "Failed to present frame");
                    }
                }
                self.frames_rendered += 1;
                self.ctx
                    .events
                    .publish_frame_rendered(session_id, frame_index, scene_number);
                let frames_rendered = self.frames_rendered;
                self.update_snapshot(|s| {
                    s.frames_rendered = frames_rendered;
                    s.last_frame_index = Some(frame_index);
                });
            }
            TickStep::Waiting { frame_index } => {
                tracing::trace!(session_id = %session_id, frame_index, "Frame not buffered, holding");
            }
            TickStep::Skipped { frame_index } => {
                tracing::warn!(session_id = %session_id, frame_index, "Frame lost, skipping");
                self.ctx.events.publish_frame_skipped(session_id, frame_index);
            }
        }

        if report.finished {
            tracing::info!(
                session_id = %session_id,
                frames_rendered = self.frames_rendered,
                "Playback complete"
            );
            self.channel.stop();
            self.ctx
                .events
                .publish_playback_finished(session_id, self.frames_rendered);
            self.update_snapshot(|s| {
                s.status = StreamStatus::PlaybackComplete;
                s.playback = PlaybackState::Stopped;
            });
        }
    }

    fn start_scene_audio(&mut self, scene_number: u32, late: bool) {
        let Some(clip) = self.audio.get(scene_number) else {
            return;
        };
        match self.channel.start(scene_number, clip) {
            Ok(()) => {
                tracing::info!(session_id = %self.session.id, scene_number, late, "Scene audio started");
                self.ctx
                    .events
                    .publish_scene_audio_started(self.session.id, scene_number, late);
            }
            Err(e) => {
                tracing::warn!(session_id = %self.session.id, scene_number, error = %e, "Failed to start scene audio");
            }
        }
    }

    /// 传输结束；pipeline_complete 之前的结束视为流失败，已缓冲的内容继续播放
    ///
    /// pipeline_complete 之后的关闭或错误（例如服务端直接断开 TCP）都是正常收尾
    fn on_transport_ended(&mut self, error: Option<TransportError>) {
        let session_id = self.session.id;
        if self.session.flags.pipeline_complete {
            match error {
                Some(e) => tracing::info!(session_id = %session_id, error = %e, "Generation stream dropped after pipeline complete"),
                None => tracing::info!(session_id = %session_id, "Generation stream closed"),
            }
            return;
        }

        let error = error.unwrap_or_else(|| {
            TransportError::ReceiveFailed("connection closed before pipeline complete".to_string())
        });
        tracing::error!(session_id = %session_id, error = %error, "Generation stream failed");
        self.report_failure(&error);

        // 门控只能由 scene_complete 打开且尚未打开时，播放永远不会开始
        if !self.gate.is_open() && self.gate.warmup().is_none() {
            tracing::info!(session_id = %session_id, "Playback never started, ending session");
            self.playhead.stop();
        }
    }

    fn report_failure(&self, error: &TransportError) {
        self.ctx
            .events
            .publish_stream_failed(self.session.id, &error.to_string());
        self.update_snapshot(|s| {
            s.status = StreamStatus::ConnectionError;
            s.is_generating = false;
        });
    }

    fn finish(&mut self, connection: Option<ConnectionHandle>) {
        self.playhead.stop();
        self.channel.stop();
        self.decodes.abort_all();
        if let Some(mut connection) = connection {
            connection.close();
        }

        tracing::info!(
            session_id = %self.session.id,
            frames_buffered = self.frames.len(),
            audio_buffered = self.audio.len(),
            frames_rendered = self.frames_rendered,
            elapsed_ms = (chrono::Utc::now() - self.session.created_at).num_milliseconds(),
            "Session ended"
        );
        self.update_snapshot(|s| {
            s.playback = PlaybackState::Stopped;
            s.is_streaming = false;
            s.is_generating = false;
        });
    }

    /// 只修改属于本会话的快照
    fn update_snapshot(&self, modify: impl FnOnce(&mut PlayerSnapshot)) {
        let session_id = self.session.id;
        self.ctx.snapshot.send_if_modified(|snapshot| {
            if snapshot.session_id != Some(session_id) {
                return false;
            }
            modify(snapshot);
            true
        });
    }
}

async fn next_tick(ticker: &mut Option<Interval>) -> Instant {
    match ticker {
        Some(ticker) => ticker.tick().await,
        None => pending().await,
    }
}

async fn warmup_elapsed(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}
