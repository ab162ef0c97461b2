//! Echo Player - 流式生成视频播放器
//!
//! 从命令行读取 prompt，连接生成服务并按固定帧率播放，直到播放完成、流失败或 ctrl-c

use std::sync::Arc;

use echo_player::application::ports::{AudioOutputPort, StreamTransportPort};
use echo_player::application::session::SessionConfig;
use echo_player::config::{
    load_config, print_config, AppConfig, AudioBackend, LogConfig, StreamProtocol,
};
use echo_player::infrastructure::decoder::{Base64MediaDecoder, OutputFormat};
use echo_player::infrastructure::events::PlayerEvent;
use echo_player::infrastructure::output::{FrameDirRenderTarget, LoggingAudioOutput};
use echo_player::infrastructure::transport::{LegacyWsTransport, WsTransport};
use echo_player::StreamPlayer;
use tokio::sync::broadcast;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config.log);

    tracing::info!("Echo Player - 流式生成视频播放器");
    print_config(&config);

    let prompt = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if prompt.trim().is_empty() {
        anyhow::bail!("Usage: echo-player <prompt>");
    }

    let render_target = Arc::new(FrameDirRenderTarget::new(
        config.output.frames_dir.clone(),
        config.output.save_every_frame,
    )?);
    let decoder = Arc::new(Base64MediaDecoder::new(OutputFormat {
        sample_rate: config.audio.sample_rate,
        channels: config.audio.channels,
    }));

    let mut player = StreamPlayer::new(
        SessionConfig::from(&config),
        build_transport(&config),
        decoder,
        build_audio_output(&config),
    );
    player.bind_render_target(render_target.clone());

    let mut events = player.subscribe();
    player.start(&prompt).await?;

    let failure = tokio::select! {
        failure = wait_for_outcome(&mut events) => failure,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal");
            None
        }
    };

    let snapshot = player.snapshot();
    tracing::info!(
        status = %snapshot.status,
        playback = snapshot.playback.as_str(),
        frames_rendered = snapshot.frames_rendered,
        frames_presented = render_target.presented_count(),
        "Playback summary"
    );

    player.reset().await;

    // 等待写线程把排队的帧写完
    let writer = render_target.clone();
    if let Ok(written) = tokio::task::spawn_blocking(move || {
        writer.close();
        writer.written_count()
    })
    .await
    {
        tracing::info!(frames_written = written, "Frame output flushed");
    }

    match failure {
        Some(error) => Err(anyhow::anyhow!("Stream failed: {}", error)),
        None => Ok(()),
    }
}

fn init_tracing(log: &LogConfig) {
    let log_filter = format!("{},echo_player={}", log.level, log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_transport(config: &AppConfig) -> Arc<dyn StreamTransportPort> {
    match config.stream.protocol {
        StreamProtocol::Unified => Arc::new(WsTransport::new(config.stream.url.clone())),
        StreamProtocol::Legacy => Arc::new(LegacyWsTransport::new(
            config.stream.legacy.video_url.clone(),
            config.stream.legacy.audio_url.clone(),
        )),
    }
}

fn build_audio_output(config: &AppConfig) -> Arc<dyn AudioOutputPort> {
    match config.audio.backend {
        AudioBackend::Log => Arc::new(LoggingAudioOutput::new()),
        AudioBackend::Device => open_device_output(),
    }
}

#[cfg(feature = "rodio-output")]
fn open_device_output() -> Arc<dyn AudioOutputPort> {
    match echo_player::infrastructure::output::RodioAudioOutput::new() {
        Ok(output) => Arc::new(output),
        Err(e) => {
            tracing::warn!(error = %e, "Audio device unavailable, falling back to log output");
            Arc::new(LoggingAudioOutput::new())
        }
    }
}

#[cfg(not(feature = "rodio-output"))]
fn open_device_output() -> Arc<dyn AudioOutputPort> {
    tracing::warn!("Built without the rodio-output feature, falling back to log output");
    Arc::new(LoggingAudioOutput::new())
}

/// 等待播放结束，返回流失败的错误信息
async fn wait_for_outcome(events: &mut broadcast::Receiver<PlayerEvent>) -> Option<String> {
    loop {
        match events.recv().await {
            Ok(PlayerEvent::PlaybackFinished {
                frames_rendered, ..
            }) => {
                tracing::info!(frames_rendered, "Playback finished");
                return None;
            }
            Ok(PlayerEvent::StreamFailed { error, .. }) => {
                tracing::error!(error = %error, "Stream failed");
                return Some(error);
            }
            Ok(PlayerEvent::SceneAudioStarted {
                scene_number, late, ..
            }) => {
                tracing::debug!(scene_number, late, "Scene audio event");
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Event receiver lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}
