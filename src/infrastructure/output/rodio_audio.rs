//! Rodio Audio Output - 系统默认音频设备
//!
//! OutputStream 不能跨线程移动，由专用音频线程持有；
//! play / stop 通过通道发送命令，线程内同一时刻最多保留一个 Sink

use std::sync::mpsc;
use std::sync::Mutex;
use std::thread::JoinHandle;

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStreamBuilder, Sink};

use crate::application::ports::{AudioOutputError, AudioOutputPort};
use crate::domain::AudioClip;

enum AudioCommand {
    Play {
        scene_number: u32,
        channels: u16,
        sample_rate: u32,
        samples: Vec<f32>,
    },
    Stop,
}

/// 设备音频输出
pub struct RodioAudioOutput {
    tx: Mutex<Option<mpsc::Sender<AudioCommand>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl RodioAudioOutput {
    /// 打开默认输出设备；设备不可用时返回 DeviceUnavailable
    pub fn new() -> Result<Self, AudioOutputError> {
        let (tx, rx) = mpsc::channel::<AudioCommand>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), String>>(1);

        let thread = std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || run_device(rx, ready_tx))
            .map_err(|e| AudioOutputError::DeviceUnavailable(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                tx: Mutex::new(Some(tx)),
                thread: Mutex::new(Some(thread)),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(AudioOutputError::DeviceUnavailable(e))
            }
            Err(_) => Err(AudioOutputError::DeviceUnavailable(
                "audio thread exited during startup".to_string(),
            )),
        }
    }

    fn send(&self, command: AudioCommand) -> Result<(), AudioOutputError> {
        let tx = self
            .tx
            .lock()
            .map_err(|_| AudioOutputError::PlaybackError("output state poisoned".to_string()))?;
        let Some(tx) = tx.as_ref() else {
            return Err(AudioOutputError::PlaybackError("audio output closed".to_string()));
        };
        tx.send(command)
            .map_err(|_| AudioOutputError::PlaybackError("audio thread stopped".to_string()))
    }

    /// 停止播放并关闭音频线程
    pub fn close(&self) {
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
        let thread = self.thread.lock().ok().and_then(|mut t| t.take());
        if let Some(thread) = thread {
            if thread.join().is_err() {
                tracing::error!("Audio output thread panicked");
            }
        }
    }
}

impl Drop for RodioAudioOutput {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_device(rx: mpsc::Receiver<AudioCommand>, ready: mpsc::SyncSender<Result<(), String>>) {
    let stream = match OutputStreamBuilder::open_default_stream() {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(format!("Failed to open default output: {}", e)));
            return;
        }
    };
    let _ = ready.send(Ok(()));
    tracing::info!("Audio output device opened");

    let mut current: Option<(u32, Sink)> = None;
    while let Ok(command) = rx.recv() {
        // 任何命令都先断开当前音频
        if let Some((scene_number, sink)) = current.take() {
            sink.stop();
            tracing::debug!(scene_number, "Scene audio disconnected");
        }
        if let AudioCommand::Play {
            scene_number,
            channels,
            sample_rate,
            samples,
        } = command
        {
            let sink = Sink::connect_new(stream.mixer());
            sink.append(SamplesBuffer::new(channels, sample_rate, samples));
            current = Some((scene_number, sink));
        }
    }

    if let Some((_, sink)) = current.take() {
        sink.stop();
    }
    tracing::info!("Audio output device closed");
}

impl AudioOutputPort for RodioAudioOutput {
    fn play(&self, scene_number: u32, clip: &AudioClip) -> Result<(), AudioOutputError> {
        tracing::info!(
            scene_number,
            sample_rate = clip.sample_rate(),
            channels = clip.channels(),
            duration_ms = clip.duration_ms(),
            "Playing scene audio"
        );
        self.send(AudioCommand::Play {
            scene_number,
            channels: clip.channels(),
            sample_rate: clip.sample_rate(),
            samples: clip.samples().to_vec(),
        })
    }

    fn stop(&self) {
        if let Err(e) = self.send(AudioCommand::Stop) {
            tracing::debug!(error = %e, "Audio stop ignored");
        }
    }
}
