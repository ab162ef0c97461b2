//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::GatePolicy;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 生成流配置
    #[serde(default)]
    pub stream: StreamConfig,

    /// 播放配置
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// 音频输出格式
    #[serde(default)]
    pub audio: AudioConfig,

    /// 帧输出配置
    #[serde(default)]
    pub output: OutputConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 协议形态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamProtocol {
    /// 单连接，带 scene_info / scene_complete 生命周期消息
    #[default]
    Unified,
    /// 视频、音频双连接
    Legacy,
}

impl std::fmt::Display for StreamProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamProtocol::Unified => write!(f, "unified"),
            StreamProtocol::Legacy => write!(f, "legacy"),
        }
    }
}

/// 生成流配置
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// 统一协议的 WebSocket 地址
    #[serde(default = "default_stream_url")]
    pub url: String,

    #[serde(default)]
    pub protocol: StreamProtocol,

    /// 请求帧率，同时决定播放 tick 周期
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// 请求场景数
    #[serde(default = "default_num_scenes")]
    pub num_scenes: u32,

    /// 旧版协议配置
    #[serde(default)]
    pub legacy: LegacyStreamConfig,
}

fn default_stream_url() -> String {
    "ws://localhost:8000/ws/generate".to_string()
}

fn default_fps() -> u32 {
    16
}

fn default_num_scenes() -> u32 {
    5
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: default_stream_url(),
            protocol: StreamProtocol::default(),
            fps: default_fps(),
            num_scenes: default_num_scenes(),
            legacy: LegacyStreamConfig::default(),
        }
    }
}

/// 旧版双连接协议配置
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyStreamConfig {
    #[serde(default = "default_video_url")]
    pub video_url: String,

    #[serde(default = "default_audio_url")]
    pub audio_url: String,

    #[serde(default = "default_blocks_per_chunk")]
    pub blocks_per_chunk: u32,

    /// 场景切换的帧索引
    #[serde(default)]
    pub switch_frame_indices: Vec<u32>,
}

fn default_video_url() -> String {
    "ws://localhost:8000/ws/video".to_string()
}

fn default_audio_url() -> String {
    "ws://localhost:8000/ws/audio".to_string()
}

fn default_blocks_per_chunk() -> u32 {
    3
}

impl Default for LegacyStreamConfig {
    fn default() -> Self {
        Self {
            video_url: default_video_url(),
            audio_url: default_audio_url(),
            blocks_per_chunk: default_blocks_per_chunk(),
            switch_frame_indices: Vec::new(),
        }
    }
}

/// 播放配置
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// 缓冲门控策略
    #[serde(default)]
    pub gate: GatePolicy,

    /// 预热时长（毫秒），仅 warmup 策略使用
    #[serde(default = "default_warmup_ms")]
    pub warmup_ms: u64,
}

fn default_warmup_ms() -> u64 {
    3000
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            gate: GatePolicy::default(),
            warmup_ms: default_warmup_ms(),
        }
    }
}

/// 音频输出后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioBackend {
    /// 只记录日志，无需音频设备
    #[default]
    Log,
    /// 系统默认输出设备（需要 rodio-output feature）
    Device,
}

impl std::fmt::Display for AudioBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioBackend::Log => write!(f, "log"),
            AudioBackend::Device => write!(f, "device"),
        }
    }
}

/// 音频输出格式，所有场景音频都重采样到此格式
#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    #[serde(default)]
    pub backend: AudioBackend,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// 声道数，1 表示单声道，2 表示立体声
    #[serde(default = "default_channels")]
    pub channels: u16,
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_channels() -> u16 {
    2
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            backend: AudioBackend::default(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
        }
    }
}

/// 帧输出配置
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// PNG 帧输出目录，未设置时只记录日志
    #[serde(default)]
    pub frames_dir: Option<PathBuf>,

    /// 每隔多少帧写一次文件
    #[serde(default = "default_save_every_frame")]
    pub save_every_frame: u32,
}

fn default_save_every_frame() -> u32 {
    1
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            frames_dir: None,
            save_every_frame: default_save_every_frame(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
