//! Wire Protocol - 生成请求与服务端消息
//!
//! 所有消息均为 JSON 文本帧，服务端消息以 `type` 字段区分

use serde::{Deserialize, Serialize};

/// 生成请求（客户端 → 服务端，连接建立后发送一次）
///
/// 两种协议形态互为备选配置，不合并
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GenerationRequest {
    /// 单连接协议
    Unified {
        question: String,
        fps: u32,
        num_scenes: u32,
    },
    /// 旧版协议：视频、音频分别走独立连接
    Legacy {
        prompts: Vec<String>,
        blocks_per_chunk: u32,
        switch_frame_indices: Vec<u32>,
        reprompts: Option<Vec<String>>,
    },
}

impl GenerationRequest {
    pub fn unified(question: impl Into<String>, fps: u32, num_scenes: u32) -> Self {
        Self::Unified {
            question: question.into(),
            fps,
            num_scenes,
        }
    }

    pub fn legacy(
        prompt: impl Into<String>,
        blocks_per_chunk: u32,
        switch_frame_indices: Vec<u32>,
    ) -> Self {
        Self::Legacy {
            prompts: vec![prompt.into()],
            blocks_per_chunk,
            switch_frame_indices,
            reprompts: None,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy { .. })
    }

    /// 请求中的用户问题
    pub fn prompt(&self) -> &str {
        match self {
            Self::Unified { question, .. } => question,
            Self::Legacy { prompts, .. } => prompts.first().map(String::as_str).unwrap_or(""),
        }
    }
}

/// 服务端消息（服务端 → 客户端）
///
/// 未知的 `type` 解析为 `Unknown`，由调用方忽略
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// 当前正在生成的场景
    SceneInfo {
        scene_number: u32,
        #[serde(default)]
        title: String,
        #[serde(default)]
        description: Option<String>,
    },
    /// 视频帧（base64 图像）
    Frame {
        frame_index: u32,
        scene_number: u32,
        data: String,
    },
    /// 场景音频（base64 音频）
    SceneAudio {
        scene_number: u32,
        audio_data: String,
    },
    /// 某个场景的媒体已可同时播放
    SceneComplete {
        #[serde(default)]
        scene_number: Option<u32>,
    },
    /// 视频生成完成，total_frames 为帧索引的开区间上界
    VideoComplete { total_frames: u32 },
    /// 整个请求的所有媒体均已发送
    PipelineComplete,
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// 解析一条文本帧
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// 消息类型名（用于日志）
    pub fn type_name(&self) -> &'static str {
        match self {
            ServerMessage::SceneInfo { .. } => "scene_info",
            ServerMessage::Frame { .. } => "frame",
            ServerMessage::SceneAudio { .. } => "scene_audio",
            ServerMessage::SceneComplete { .. } => "scene_complete",
            ServerMessage::VideoComplete { .. } => "video_complete",
            ServerMessage::PipelineComplete => "pipeline_complete",
            ServerMessage::Unknown => "unknown",
        }
    }
}

/// 当前正在生成的场景描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneInfo {
    pub scene_number: u32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// 旧版协议：由切换帧索引推导帧所属场景
///
/// 场景从 1 开始编号，每个 `<= frame_index` 的切换点使场景号加一
pub fn scene_for_frame(switch_frame_indices: &[u32], frame_index: u32) -> u32 {
    let switches = switch_frame_indices
        .iter()
        .filter(|&&switch| switch <= frame_index)
        .count() as u32;
    1 + switches
}
