//! Frame Directory Render Target - 将呈现的帧写成 PNG 文件
//!
//! PNG 编码和写盘在独立的写线程里完成，present 只把帧放进有界队列，
//! 不阻塞会话的 tick

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use crate::application::ports::{RenderError, RenderTargetPort};
use crate::domain::DecodedFrame;

/// 写队列容量，队列满时丢弃本次落盘（帧仍视为已呈现）
const WRITE_QUEUE_CAPACITY: usize = 64;

struct FrameWriter {
    tx: Mutex<Option<mpsc::Sender<(u32, DecodedFrame)>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

/// 帧目录渲染目标
///
/// 未配置目录时只记录日志；save_every 控制每隔多少帧落盘一次
pub struct FrameDirRenderTarget {
    dir: Option<PathBuf>,
    save_every: u32,
    presented: AtomicU64,
    written: Arc<AtomicU64>,
    writer: Option<FrameWriter>,
}

impl FrameDirRenderTarget {
    pub fn new(dir: Option<PathBuf>, save_every: u32) -> Result<Self, RenderError> {
        let written = Arc::new(AtomicU64::new(0));
        let writer = match &dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| {
                    RenderError::IoError(format!("Failed to create {}: {}", dir.display(), e))
                })?;
                Some(Self::spawn_writer(dir.clone(), written.clone())?)
            }
            None => None,
        };
        Ok(Self {
            dir,
            save_every: save_every.max(1),
            presented: AtomicU64::new(0),
            written,
            writer,
        })
    }

    /// 只记录日志，不写文件
    pub fn log_only() -> Self {
        Self {
            dir: None,
            save_every: 1,
            presented: AtomicU64::new(0),
            written: Arc::new(AtomicU64::new(0)),
            writer: None,
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn presented_count(&self) -> u64 {
        self.presented.load(Ordering::Relaxed)
    }

    /// 已写入磁盘的帧数
    pub fn written_count(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// 关闭写队列并等待已排队的帧写完，可重复调用
    pub fn close(&self) {
        let Some(writer) = &self.writer else {
            return;
        };
        if let Ok(mut tx) = writer.tx.lock() {
            tx.take();
        }
        let thread = writer.thread.lock().ok().and_then(|mut t| t.take());
        if let Some(thread) = thread {
            if thread.join().is_err() {
                tracing::error!("Frame writer thread panicked");
            }
        }
    }

    fn spawn_writer(
        dir: PathBuf,
        written: Arc<AtomicU64>,
    ) -> Result<FrameWriter, RenderError> {
        let (tx, mut rx) = mpsc::channel::<(u32, DecodedFrame)>(WRITE_QUEUE_CAPACITY);
        let thread = std::thread::Builder::new()
            .name("frame-writer".to_string())
            .spawn(move || {
                while let Some((frame_index, frame)) = rx.blocking_recv() {
                    let path = Self::frame_path(&dir, frame_index);
                    match frame.image().save_with_format(&path, image::ImageFormat::Png) {
                        Ok(()) => {
                            written.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            tracing::warn!(path = %path.display(), error = %e, "Failed to write frame");
                        }
                    }
                }
                tracing::debug!("Frame writer stopped");
            })
            .map_err(|e| RenderError::Unavailable(format!("Failed to start frame writer: {}", e)))?;

        Ok(FrameWriter {
            tx: Mutex::new(Some(tx)),
            thread: Mutex::new(Some(thread)),
        })
    }

    fn frame_path(dir: &Path, frame_index: u32) -> PathBuf {
        dir.join(format!("frame_{:06}.png", frame_index))
    }
}

impl Drop for FrameDirRenderTarget {
    fn drop(&mut self) {
        self.close();
    }
}

impl RenderTargetPort for FrameDirRenderTarget {
    fn present(&self, frame_index: u32, frame: &DecodedFrame) -> Result<(), RenderError> {
        self.presented.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            frame_index,
            width = frame.width(),
            height = frame.height(),
            "Frame presented"
        );

        let Some(writer) = &self.writer else {
            return Ok(());
        };
        if frame_index % self.save_every != 0 {
            return Ok(());
        }

        let tx = writer
            .tx
            .lock()
            .map_err(|_| RenderError::Unavailable("frame writer state poisoned".to_string()))?;
        let Some(tx) = tx.as_ref() else {
            return Err(RenderError::Unavailable("frame writer closed".to_string()));
        };
        match tx.try_send((frame_index, frame.clone())) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(frame_index, "Frame writer queue full, dropping save");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(RenderError::Unavailable("frame writer stopped".to_string()))
            }
        }
    }
}
