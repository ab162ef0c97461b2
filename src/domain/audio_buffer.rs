//! Audio Buffer - 场景号到场景音频的映射

use std::collections::HashMap;

use super::media::AudioClip;

/// 场景音频缓冲
///
/// 每个场景至多一段音频，按场景顺序消费
#[derive(Debug, Default)]
pub struct AudioBuffer {
    clips: HashMap<u32, AudioClip>,
}

impl AudioBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入场景音频，返回被覆盖的旧音频
    pub fn insert(&mut self, scene_number: u32, clip: AudioClip) -> Option<AudioClip> {
        let previous = self.clips.insert(scene_number, clip);
        if previous.is_some() {
            tracing::debug!(scene_number, "Scene audio replaced");
        }
        previous
    }

    pub fn get(&self, scene_number: u32) -> Option<&AudioClip> {
        self.clips.get(&scene_number)
    }

    pub fn contains(&self, scene_number: u32) -> bool {
        self.clips.contains_key(&scene_number)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn clear(&mut self) {
        self.clips.clear();
    }
}
