//! Domain Layer - 领域层
//!
//! 流式播放的核心模型:
//! - media: 解码后的帧与音频
//! - frame_buffer / audio_buffer: 乱序写入、顺序消费的缓冲
//! - protocol: 生成请求与服务端消息
//! - playback: 固定帧率播放状态机
//! - gate: 播放启动前的缓冲门控
//! - status: 面向用户的状态文本

pub mod audio_buffer;
pub mod frame_buffer;
pub mod gate;
pub mod media;
pub mod playback;
pub mod protocol;
pub mod status;

pub use audio_buffer::AudioBuffer;
pub use frame_buffer::{FrameBuffer, FrameEntry};
pub use gate::{BufferingGate, GatePolicy, GateTrigger};
pub use media::{AudioClip, DecodedFrame, DecodedMedia, MediaKind};
pub use playback::{AudioCue, CompletionFlags, PlaybackState, Playhead, TickReport, TickStep};
pub use protocol::{scene_for_frame, GenerationRequest, SceneInfo, ServerMessage};
pub use status::StreamStatus;
