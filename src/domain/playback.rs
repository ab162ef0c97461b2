//! Playback Scheduler - 固定帧率播放状态机
//!
//! 状态流转: Idle → Buffering → Playing → Stopped
//!
//! 本模块只包含纯状态逻辑，计时器与渲染输出由会话 actor 驱动

use serde::Serialize;

use super::audio_buffer::AudioBuffer;
use super::frame_buffer::FrameBuffer;

/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Buffering,
    Playing,
    Stopped,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Buffering => "buffering",
            PlaybackState::Playing => "playing",
            PlaybackState::Stopped => "stopped",
        }
    }
}

/// 生成完成标记
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionFlags {
    pub video_complete: bool,
    pub pipeline_complete: bool,
    pub total_frames: Option<u32>,
}

impl CompletionFlags {
    pub fn mark_video_complete(&mut self, total_frames: u32) {
        self.video_complete = true;
        self.total_frames = Some(total_frames);
    }

    pub fn mark_pipeline_complete(&mut self) {
        self.pipeline_complete = true;
    }

    /// 已确认的总帧数（video_complete 之后才有意义）
    pub fn known_total(&self) -> Option<u32> {
        if self.video_complete {
            self.total_frames
        } else {
            None
        }
    }

    /// 终止条件: video_complete 且游标 >= total_frames
    pub fn reached_end(&self, cursor: u32) -> bool {
        matches!(self.known_total(), Some(total) if cursor >= total)
    }
}

/// 单次 tick 的帧处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStep {
    /// 非 Playing 状态，未处理
    Inactive,
    /// 帧已渲染，游标前进
    Rendered { frame_index: u32, scene_number: u32 },
    /// 帧尚未到达，保持上一帧
    Waiting { frame_index: u32 },
    /// 帧已确定丢失，游标前进但不渲染
    Skipped { frame_index: u32 },
}

/// 单次 tick 的音频动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCue {
    Keep,
    /// 跨越场景边界：停止当前音频，若可用则播放新场景音频
    Switch { scene_number: u32, available: bool },
    /// 当前场景的音频迟到，现已可用
    LateStart { scene_number: u32 },
}

/// tick 报告
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub step: TickStep,
    pub audio: AudioCue,
    /// 本次 tick 触发了终止
    pub finished: bool,
}

impl TickReport {
    fn inactive() -> Self {
        Self {
            step: TickStep::Inactive,
            audio: AudioCue::Keep,
            finished: false,
        }
    }
}

/// 播放头
///
/// 不变量:
/// - cursor 单调递增，只跳过已确定丢失的帧
/// - scene_cursor 只在渲染到不同场景的帧时改变
/// - Stopped 为终态
#[derive(Debug, Default)]
pub struct Playhead {
    state: PlaybackState,
    cursor: u32,
    scene_cursor: Option<u32>,
    audio_pending: bool,
}

impl Playhead {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn scene_cursor(&self) -> Option<u32> {
        self.scene_cursor
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// 生成开始，进入缓冲
    pub fn begin_buffering(&mut self) {
        if self.state == PlaybackState::Idle {
            self.state = PlaybackState::Buffering;
        }
    }

    /// 开始播放，返回是否真正发生了状态转换
    ///
    /// 已在播放或已停止时返回 false，防止同一会话出现两个计时器
    pub fn start(&mut self) -> bool {
        match self.state {
            PlaybackState::Playing | PlaybackState::Stopped => false,
            PlaybackState::Idle | PlaybackState::Buffering => {
                self.state = PlaybackState::Playing;
                true
            }
        }
    }

    /// 停止播放（幂等）
    pub fn stop(&mut self) -> bool {
        if self.state == PlaybackState::Stopped {
            return false;
        }
        self.state = PlaybackState::Stopped;
        self.audio_pending = false;
        true
    }

    /// 执行一次 tick
    pub fn tick(
        &mut self,
        frames: &FrameBuffer,
        audio: &AudioBuffer,
        flags: &CompletionFlags,
    ) -> TickReport {
        if self.state != PlaybackState::Playing {
            return TickReport::inactive();
        }

        let frame_index = self.cursor;
        let mut cue = AudioCue::Keep;

        let step = match frames.get(frame_index) {
            Some(entry) => {
                let scene_number = entry.scene_number;
                if self.scene_cursor != Some(scene_number) {
                    let available = audio.contains(scene_number);
                    self.scene_cursor = Some(scene_number);
                    self.audio_pending = !available;
                    cue = AudioCue::Switch {
                        scene_number,
                        available,
                    };
                }
                self.cursor += 1;
                TickStep::Rendered {
                    frame_index,
                    scene_number,
                }
            }
            None if frames.is_lost(frame_index, flags.known_total()) => {
                self.cursor += 1;
                TickStep::Skipped { frame_index }
            }
            None => TickStep::Waiting { frame_index },
        };

        if cue == AudioCue::Keep && self.audio_pending {
            if let Some(scene_number) = self.scene_cursor {
                if audio.contains(scene_number) {
                    self.audio_pending = false;
                    cue = AudioCue::LateStart { scene_number };
                }
            }
        }

        let finished = flags.reached_end(self.cursor);
        if finished {
            self.stop();
        }

        TickReport {
            step,
            audio: cue,
            finished,
        }
    }
}
