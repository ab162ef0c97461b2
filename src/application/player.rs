//! Stream Player - 面向调用方的播放门面
//!
//! 持有当前会话句柄；start / stop / reset 都会先取消并等待旧会话退出

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use super::error::PlayerError;
use super::ports::{AudioOutputPort, MediaDecoderPort, RenderTargetPort, StreamTransportPort};
use super::session::{Session, SessionConfig, SessionContext, SessionHandle};
use crate::domain::{PlaybackState, SceneInfo, StreamStatus};
use crate::infrastructure::events::{EventPublisher, PlayerEvent};

/// 可观察的播放器状态
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub session_id: Option<Uuid>,
    pub is_streaming: bool,
    pub is_generating: bool,
    pub status: StreamStatus,
    pub current_scene: Option<SceneInfo>,
    pub playback: PlaybackState,
    pub frames_rendered: u64,
    pub last_frame_index: Option<u32>,
}

/// 流式播放器
pub struct StreamPlayer {
    config: SessionConfig,
    transport: Arc<dyn StreamTransportPort>,
    decoder: Arc<dyn MediaDecoderPort>,
    audio_output: Arc<dyn AudioOutputPort>,
    render_target: Option<Arc<dyn RenderTargetPort>>,
    events: Arc<EventPublisher>,
    snapshot: Arc<watch::Sender<PlayerSnapshot>>,
    active: Option<SessionHandle>,
}

impl StreamPlayer {
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn StreamTransportPort>,
        decoder: Arc<dyn MediaDecoderPort>,
        audio_output: Arc<dyn AudioOutputPort>,
    ) -> Self {
        let (snapshot, _) = watch::channel(PlayerSnapshot::default());
        Self {
            config,
            transport,
            decoder,
            audio_output,
            render_target: None,
            events: EventPublisher::new().arc(),
            snapshot: Arc::new(snapshot),
            active: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn bind_render_target(&mut self, target: Arc<dyn RenderTargetPort>) {
        self.render_target = Some(target);
    }

    /// 解绑渲染目标，已运行的会话继续使用绑定时的目标
    pub fn unbind_render_target(&mut self) {
        self.render_target = None;
    }

    /// 开始新的生成会话，旧会话先被取消
    pub async fn start(&mut self, prompt: &str) -> Result<(), PlayerError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(PlayerError::validation("Prompt cannot be empty"));
        }

        let Some(render_target) = self.render_target.clone() else {
            tracing::error!("Cannot start playback without a bound render target");
            return Err(PlayerError::RenderTargetUnbound);
        };

        self.cancel_active().await;

        let session = Session::new(prompt);
        let session_id = session.id;
        self.snapshot.send_replace(PlayerSnapshot {
            session_id: Some(session_id),
            is_streaming: true,
            is_generating: true,
            status: StreamStatus::Generating,
            ..Default::default()
        });
        self.events.publish_session_started(session_id, prompt);
        tracing::info!(session_id = %session_id, prompt = %prompt, "Session started");

        let ctx = SessionContext {
            transport: self.transport.clone(),
            decoder: self.decoder.clone(),
            render_target,
            audio_output: self.audio_output.clone(),
            events: self.events.clone(),
            snapshot: self.snapshot.clone(),
        };
        self.active = Some(SessionHandle::spawn(session, self.config.clone(), ctx));
        Ok(())
    }

    /// 停止当前会话（幂等）
    pub async fn stop(&mut self) {
        let Some(session_id) = self.cancel_active().await else {
            return;
        };
        self.snapshot.send_if_modified(|s| {
            if s.session_id != Some(session_id) {
                return false;
            }
            s.is_streaming = false;
            s.is_generating = false;
            s.playback = PlaybackState::Stopped;
            s.status = StreamStatus::Idle;
            true
        });
        tracing::info!(session_id = %session_id, "Session stopped");
    }

    /// 取消当前会话并清空所有状态
    pub async fn reset(&mut self) {
        if let Some(session_id) = self.cancel_active().await {
            tracing::info!(session_id = %session_id, "Session reset");
        }
        self.snapshot.send_replace(PlayerSnapshot::default());
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<PlayerSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    /// 当前会话 actor 是否仍在运行
    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|h| !h.is_finished())
    }

    async fn cancel_active(&mut self) -> Option<Uuid> {
        let handle = self.active.take()?;
        let session_id = handle.id();
        handle.shutdown().await;
        Some(session_id)
    }
}

impl Drop for StreamPlayer {
    fn drop(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::TransportError;
    use crate::domain::{GatePolicy, ServerMessage};
    use crate::test_support::{
        audio_msg, frame_msg, AudioCall, RecordingAudioOutput, RecordingRenderTarget,
        ScriptStep, ScriptedTransport, StubDecoder,
    };
    use std::time::Duration;
    use tokio::time::Instant;

    struct Harness {
        player: StreamPlayer,
        transport: Arc<ScriptedTransport>,
        target: Arc<RecordingRenderTarget>,
        audio: Arc<RecordingAudioOutput>,
    }

    fn harness(config: SessionConfig, scripts: Vec<Vec<ScriptStep>>) -> Harness {
        let transport = Arc::new(ScriptedTransport::new(scripts));
        let target = Arc::new(RecordingRenderTarget::new());
        let audio = Arc::new(RecordingAudioOutput::new());
        let mut player = StreamPlayer::new(
            config,
            transport.clone(),
            Arc::new(StubDecoder),
            audio.clone(),
        );
        player.bind_render_target(target.clone());
        Harness {
            player,
            transport,
            target,
            audio,
        }
    }

    fn session_config(fps: u32) -> SessionConfig {
        SessionConfig {
            fps,
            ..Default::default()
        }
    }

    async fn wait_for_finish(rx: &mut broadcast::Receiver<PlayerEvent>) -> PlayerEvent {
        loop {
            match rx.recv().await {
                Ok(event @ PlayerEvent::PlaybackFinished { .. })
                | Ok(event @ PlayerEvent::StreamFailed { .. }) => return event,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    }

    async fn wait_until_inactive(player: &StreamPlayer) {
        while player.is_active() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_start_rejects_empty_prompt() {
        let mut h = harness(session_config(16), vec![]);
        let err = h.player.start("   ").await.unwrap_err();
        assert!(matches!(err, PlayerError::ValidationError(_)));
        assert_eq!(h.transport.open_count(), 0);
    }

    #[tokio::test]
    async fn test_start_requires_render_target() {
        let mut h = harness(session_config(16), vec![]);
        h.player.unbind_render_target();
        let err = h.player.start("a cat").await.unwrap_err();
        assert!(matches!(err, PlayerError::RenderTargetUnbound));
        assert_eq!(h.transport.open_count(), 0);
        assert_eq!(h.player.snapshot(), PlayerSnapshot::default());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut h = harness(session_config(16), vec![vec![ScriptStep::Hang]]);
        h.player.stop().await;
        h.player.stop().await;
        assert_eq!(h.player.snapshot().playback, PlaybackState::Idle);
        assert_eq!(h.player.snapshot().status, StreamStatus::Idle);

        h.player.start("a cat").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.player.stop().await;
        h.player.stop().await;
        let snapshot = h.player.snapshot();
        assert_eq!(snapshot.playback, PlaybackState::Stopped);
        assert_eq!(snapshot.status, StreamStatus::Idle);
        assert!(!snapshot.is_streaming);
        assert!(!h.player.is_active());
        assert_eq!(h.transport.closed_count(), 1);
    }

    #[tokio::test]
    async fn test_reset_clears_snapshot() {
        let mut h = harness(session_config(16), vec![vec![ScriptStep::Hang]]);
        h.player.start("a cat").await.unwrap();
        h.player.reset().await;
        h.player.reset().await;
        assert_eq!(h.player.snapshot(), PlayerSnapshot::default());
    }

    #[tokio::test]
    async fn test_sends_single_request() {
        let mut h = harness(session_config(16), vec![vec![ScriptStep::Hang]]);
        h.player.start("  a cat  ").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let requests = h.transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt(), "a cat");
        assert_eq!(h.player.snapshot().status, StreamStatus::Generating);
        h.player.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_prebuffered_frames_render_at_fixed_cadence() {
        let mut script: Vec<ScriptStep> = (0..24).map(|i| frame_msg(i, 1, i as u8)).collect();
        script.push(ScriptStep::Wait(Duration::from_millis(10)));
        script.push(ScriptStep::Send(ServerMessage::VideoComplete { total_frames: 24 }));
        script.push(ScriptStep::Send(ServerMessage::SceneComplete {
            scene_number: Some(1),
        }));
        script.push(ScriptStep::Hang);

        let mut h = harness(session_config(24), vec![script]);
        let mut events = h.player.subscribe();
        h.player.start("a cat").await.unwrap();

        let finished = wait_for_finish(&mut events).await;
        assert!(matches!(
            finished,
            PlayerEvent::PlaybackFinished {
                frames_rendered: 24,
                ..
            }
        ));

        let presented = h.target.presented();
        let indices: Vec<u32> = presented.iter().map(|p| p.frame_index).collect();
        assert_eq!(indices, (0..24).collect::<Vec<_>>());

        let gate_open: Instant = presented[0].at;
        for (k, p) in presented.iter().enumerate() {
            let expected = Duration::from_secs_f64(k as f64 / 24.0);
            let actual = p.at - gate_open;
            let drift = if actual > expected {
                actual - expected
            } else {
                expected - actual
            };
            assert!(
                drift <= Duration::from_millis(2),
                "frame {k} at {actual:?}, expected {expected:?}"
            );
        }
        wait_until_inactive(&h.player).await;
        assert_eq!(h.player.snapshot().status, StreamStatus::PlaybackComplete);
        assert_eq!(h.player.snapshot().playback, PlaybackState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_order_frames_render_in_order() {
        let order = [3u32, 0, 5, 1, 4, 2];
        let mut script: Vec<ScriptStep> = order.iter().map(|&i| frame_msg(i, 1, 0)).collect();
        script.push(ScriptStep::Send(ServerMessage::SceneComplete {
            scene_number: Some(1),
        }));
        script.push(ScriptStep::Send(ServerMessage::VideoComplete { total_frames: 6 }));
        script.push(ScriptStep::Hang);

        let mut h = harness(session_config(16), vec![script]);
        let mut events = h.player.subscribe();
        h.player.start("a cat").await.unwrap();
        wait_for_finish(&mut events).await;

        let indices: Vec<u32> = h.target.presented().iter().map(|p| p.frame_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_frame_is_skipped_after_video_complete() {
        let mut script: Vec<ScriptStep> = (0..5).map(|i| frame_msg(i, 1, 0)).collect();
        script.push(ScriptStep::Send(ServerMessage::SceneComplete {
            scene_number: Some(1),
        }));
        // 播放到 5 时等待，帧 5 可能仍会到达
        script.push(ScriptStep::Wait(Duration::from_millis(1000)));
        script.extend((6..10).map(|i| frame_msg(i, 1, 0)));
        script.push(ScriptStep::Wait(Duration::from_millis(10)));
        script.push(ScriptStep::Send(ServerMessage::VideoComplete { total_frames: 10 }));
        script.push(ScriptStep::Hang);

        let mut h = harness(session_config(16), vec![script]);
        let mut events = h.player.subscribe();
        let mut watch = h.player.watch();
        h.player.start("a cat").await.unwrap();

        // 等待期间光标停在 5，帧 4 保持在屏幕上
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert_eq!(watch.borrow_and_update().last_frame_index, Some(4));
        assert_eq!(h.player.snapshot().playback, PlaybackState::Playing);

        let mut skipped = Vec::new();
        loop {
            match events.recv().await.unwrap() {
                PlayerEvent::FrameSkipped { frame_index, .. } => skipped.push(frame_index),
                PlayerEvent::PlaybackFinished { frames_rendered, .. } => {
                    assert_eq!(frames_rendered, 9);
                    break;
                }
                _ => {}
            }
        }
        assert_eq!(skipped, vec![5]);

        let indices: Vec<u32> = h.target.presented().iter().map(|p| p.frame_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 6, 7, 8, 9]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_scene_audio_starts_on_later_tick() {
        let mut script: Vec<ScriptStep> = (0..4).map(|i| frame_msg(i, 0, 0)).collect();
        script.push(ScriptStep::Send(ServerMessage::SceneComplete {
            scene_number: Some(0),
        }));
        script.push(ScriptStep::Wait(Duration::from_millis(100)));
        script.push(audio_msg(0, 7));
        script.extend((4..8).map(|i| frame_msg(i, 1, 0)));
        script.push(audio_msg(1, 8));
        script.push(ScriptStep::Send(ServerMessage::VideoComplete { total_frames: 8 }));
        script.push(ScriptStep::Hang);

        let mut h = harness(session_config(16), vec![script]);
        let mut events = h.player.subscribe();
        h.player.start("a cat").await.unwrap();

        let mut audio_events = Vec::new();
        loop {
            match events.recv().await.unwrap() {
                PlayerEvent::SceneAudioStarted {
                    scene_number, late, ..
                } => audio_events.push((scene_number, late)),
                PlayerEvent::PlaybackFinished { .. } => break,
                _ => {}
            }
        }
        assert_eq!(audio_events, vec![(0, true), (1, false)]);
        assert_eq!(h.audio.max_concurrent(), 1);

        let calls = h.audio.calls();
        let first_play_1 = calls
            .iter()
            .position(|c| *c == AudioCall::Play(1))
            .unwrap();
        assert_eq!(calls[first_play_1 - 1], AudioCall::Stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scene_zero_audio_starts_with_first_frame() {
        let script = vec![
            audio_msg(0, 1),
            frame_msg(0, 0, 0),
            frame_msg(1, 0, 0),
            ScriptStep::Wait(Duration::from_millis(10)),
            ScriptStep::Send(ServerMessage::VideoComplete { total_frames: 2 }),
            ScriptStep::Send(ServerMessage::SceneComplete {
                scene_number: Some(0),
            }),
            ScriptStep::Hang,
        ];
        let mut h = harness(session_config(16), vec![script]);
        let mut events = h.player.subscribe();
        h.player.start("a cat").await.unwrap();
        wait_for_finish(&mut events).await;

        assert_eq!(h.audio.calls().first(), Some(&AudioCall::Play(0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_discards_previous_session_media() {
        // 第一个会话的帧解码缓慢，第二个会话启动时仍在进行中
        let mut first: Vec<ScriptStep> = (0..3)
            .map(|i| {
                ScriptStep::Send(ServerMessage::Frame {
                    frame_index: i,
                    scene_number: 1,
                    data: "slow:1".to_string(),
                })
            })
            .collect();
        first.push(ScriptStep::Hang);
        let mut second: Vec<ScriptStep> = (0..3).map(|i| frame_msg(i, 1, 2)).collect();
        second.push(ScriptStep::Wait(Duration::from_millis(10)));
        second.push(ScriptStep::Send(ServerMessage::VideoComplete { total_frames: 3 }));
        second.push(ScriptStep::Send(ServerMessage::SceneComplete {
            scene_number: Some(1),
        }));
        second.push(ScriptStep::Hang);

        let mut h = harness(session_config(16), vec![first, second]);
        let mut events = h.player.subscribe();

        h.player.start("p1").await.unwrap();
        let first_id = h.player.snapshot().session_id.unwrap();
        while h.transport.open_count() < 1 {
            tokio::task::yield_now().await;
        }
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        h.player.start("p2").await.unwrap();
        let second_id = h.player.snapshot().session_id.unwrap();
        assert_ne!(first_id, second_id);
        assert_eq!(h.transport.closed_count(), 1);

        loop {
            let event = events.recv().await.unwrap();
            if event.session_id() == second_id
                && matches!(event, PlayerEvent::PlaybackFinished { .. })
            {
                break;
            }
            if let PlayerEvent::FrameRendered { session_id, .. } = event {
                assert_eq!(session_id, second_id);
            }
        }

        let presented = h.target.presented();
        assert_eq!(presented.len(), 3);
        assert!(presented.iter().all(|p| p.marker == 2));
        assert_eq!(h.player.snapshot().session_id, Some(second_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_waits_for_video_complete_after_close() {
        let script = vec![
            frame_msg(0, 1, 0),
            frame_msg(1, 1, 0),
            ScriptStep::Send(ServerMessage::SceneComplete {
                scene_number: Some(1),
            }),
            ScriptStep::Wait(Duration::from_millis(10)),
            ScriptStep::Close,
        ];
        let mut h = harness(session_config(16), vec![script]);
        let mut events = h.player.subscribe();
        h.player.start("a cat").await.unwrap();

        let failed = wait_for_finish(&mut events).await;
        assert!(matches!(failed, PlayerEvent::StreamFailed { .. }));

        tokio::time::sleep(Duration::from_secs(2)).await;
        let snapshot = h.player.snapshot();
        assert_eq!(snapshot.status, StreamStatus::ConnectionError);
        // 没有 video_complete，播放不会终止
        assert_eq!(snapshot.playback, PlaybackState::Playing);
        assert_eq!(snapshot.frames_rendered, 2);
        assert!(h.player.is_active());

        h.player.stop().await;
        assert_eq!(h.player.snapshot().playback, PlaybackState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_after_pipeline_complete_is_teardown() {
        // 服务端发送 pipeline_complete 后直接断开 TCP，没有关闭握手
        let script = vec![
            frame_msg(0, 1, 0),
            frame_msg(1, 1, 0),
            ScriptStep::Send(ServerMessage::SceneComplete {
                scene_number: Some(1),
            }),
            ScriptStep::Send(ServerMessage::VideoComplete { total_frames: 2 }),
            ScriptStep::Send(ServerMessage::PipelineComplete),
            ScriptStep::Fail(TransportError::ReceiveFailed(
                "reset without closing handshake".to_string(),
            )),
        ];
        let mut h = harness(session_config(16), vec![script]);
        let mut events = h.player.subscribe();
        h.player.start("a cat").await.unwrap();

        let mut seen = Vec::new();
        loop {
            match events.recv().await.unwrap() {
                PlayerEvent::StreamFailed { error, .. } => seen.push(error),
                PlayerEvent::PlaybackFinished {
                    frames_rendered, ..
                } => {
                    assert_eq!(frames_rendered, 2);
                    break;
                }
                _ => {}
            }
        }
        assert!(seen.is_empty(), "unexpected stream failure: {seen:?}");

        wait_until_inactive(&h.player).await;
        let snapshot = h.player.snapshot();
        assert_eq!(snapshot.status, StreamStatus::PlaybackComplete);
        assert_eq!(snapshot.playback, PlaybackState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_before_pipeline_complete_keeps_playing() {
        let mut script: Vec<ScriptStep> = (0..4).map(|i| frame_msg(i, 1, 0)).collect();
        script.push(ScriptStep::Send(ServerMessage::SceneComplete {
            scene_number: Some(1),
        }));
        script.push(ScriptStep::Send(ServerMessage::VideoComplete { total_frames: 4 }));
        script.push(ScriptStep::Fail(TransportError::ReceiveFailed(
            "connection reset".to_string(),
        )));
        let mut h = harness(session_config(16), vec![script]);
        let mut events = h.player.subscribe();
        let mut watch = h.player.watch();
        h.player.start("a cat").await.unwrap();

        let failed = wait_for_finish(&mut events).await;
        match failed {
            PlayerEvent::StreamFailed { error, .. } => assert!(error.contains("connection reset")),
            other => panic!("expected stream failure, got {other:?}"),
        }
        watch
            .wait_for(|s| s.status == StreamStatus::ConnectionError)
            .await
            .unwrap();

        // 已缓冲的帧继续播放到终止，不会重连
        let finished = wait_for_finish(&mut events).await;
        assert!(matches!(
            finished,
            PlayerEvent::PlaybackFinished {
                frames_rendered: 4,
                ..
            }
        ));
        let indices: Vec<u32> = h.target.presented().iter().map(|p| p.frame_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(h.transport.open_count(), 1);
        assert_eq!(h.transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_mid_stream_holds_rendered_frames() {
        let script = vec![
            frame_msg(0, 1, 0),
            frame_msg(1, 1, 0),
            ScriptStep::Send(ServerMessage::SceneComplete {
                scene_number: Some(1),
            }),
            ScriptStep::Wait(Duration::from_millis(10)),
            ScriptStep::Fail(TransportError::ReceiveFailed("connection reset".to_string())),
        ];
        let mut h = harness(session_config(16), vec![script]);
        let mut events = h.player.subscribe();
        h.player.start("a cat").await.unwrap();

        let failed = wait_for_finish(&mut events).await;
        assert!(matches!(failed, PlayerEvent::StreamFailed { .. }));

        tokio::time::sleep(Duration::from_secs(2)).await;
        let snapshot = h.player.snapshot();
        assert_eq!(snapshot.status, StreamStatus::ConnectionError);
        assert_eq!(snapshot.playback, PlaybackState::Playing);
        assert_eq!(snapshot.frames_rendered, 2);
        assert_eq!(snapshot.last_frame_index, Some(1));
        assert_eq!(h.transport.open_count(), 1);

        h.player.stop().await;
    }

    #[tokio::test]
    async fn test_open_failure_reports_connection_error() {
        let transport = Arc::new(ScriptedTransport::failing(TransportError::ConnectFailed(
            "refused".to_string(),
        )));
        let mut player = StreamPlayer::new(
            session_config(16),
            transport,
            Arc::new(StubDecoder),
            Arc::new(RecordingAudioOutput::new()),
        );
        player.bind_render_target(Arc::new(RecordingRenderTarget::new()));
        let mut events = player.subscribe();

        player.start("a cat").await.unwrap();
        let failed = wait_for_finish(&mut events).await;
        assert!(matches!(failed, PlayerEvent::StreamFailed { .. }));

        wait_until_inactive(&player).await;
        let snapshot = player.snapshot();
        assert_eq!(snapshot.status, StreamStatus::ConnectionError);
        assert_eq!(snapshot.playback, PlaybackState::Stopped);
        assert!(!snapshot.is_streaming);
    }

    #[tokio::test(start_paused = true)]
    async fn test_warmup_gate_opens_without_scene_complete() {
        let script = vec![
            frame_msg(0, 1, 0),
            frame_msg(1, 1, 0),
            ScriptStep::Send(ServerMessage::VideoComplete { total_frames: 2 }),
            ScriptStep::Hang,
        ];
        let config = SessionConfig {
            gate_policy: GatePolicy::Warmup,
            warmup: Duration::from_millis(3000),
            ..session_config(16)
        };
        let mut h = harness(config, vec![script]);
        let mut events = h.player.subscribe();
        let started = Instant::now();
        h.player.start("a cat").await.unwrap();

        wait_for_finish(&mut events).await;
        let presented = h.target.presented();
        assert_eq!(presented.len(), 2);
        assert!(presented[0].at - started >= Duration::from_millis(3000));
    }
}
