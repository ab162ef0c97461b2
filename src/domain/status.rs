//! Stream Status - 面向用户的状态文本

use serde::{Serialize, Serializer};

/// 流状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamStatus {
    #[default]
    Idle,
    Generating,
    Playing,
    GenerationComplete,
    PlaybackComplete,
    ConnectionError,
}

impl StreamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamStatus::Idle => "",
            StreamStatus::Generating => "Generating Stream",
            StreamStatus::Playing => "Playing (still receiving data)...",
            StreamStatus::GenerationComplete => "Generation complete!",
            StreamStatus::PlaybackComplete => "Playback complete!",
            StreamStatus::ConnectionError => "Connection error",
        }
    }
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StreamStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
