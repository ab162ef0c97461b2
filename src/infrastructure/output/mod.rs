//! 渲染目标与音频输出实现

mod frame_dir;
mod logging_audio;
#[cfg(feature = "rodio-output")]
mod rodio_audio;

pub use frame_dir::FrameDirRenderTarget;
pub use logging_audio::LoggingAudioOutput;
#[cfg(feature = "rodio-output")]
pub use rodio_audio::RodioAudioOutput;
