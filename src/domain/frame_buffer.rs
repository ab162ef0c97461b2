//! Frame Buffer - 帧索引到已解码帧的稀疏映射
//!
//! 插入顺序任意（网络乱序、解码乱序），消费严格按索引顺序

use std::collections::{HashMap, HashSet};

use super::media::DecodedFrame;

/// 帧缓冲条目
#[derive(Debug, Clone)]
pub struct FrameEntry {
    pub frame: DecodedFrame,
    pub scene_number: u32,
}

/// 帧缓冲
///
/// 不变量:
/// - 每个索引至多一个条目
/// - 会话期间不淘汰任何条目
/// - pending 只记录已收到但尚未完成解码的索引
#[derive(Debug, Default)]
pub struct FrameBuffer {
    entries: HashMap<u32, FrameEntry>,
    pending: HashSet<u32>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 标记索引正在解码
    pub fn mark_pending(&mut self, frame_index: u32) {
        self.pending.insert(frame_index);
    }

    /// 解码失败，放弃该索引
    pub fn abandon(&mut self, frame_index: u32) {
        self.pending.remove(&frame_index);
    }

    /// 插入帧，返回被覆盖的旧条目
    pub fn insert(&mut self, frame_index: u32, entry: FrameEntry) -> Option<FrameEntry> {
        self.pending.remove(&frame_index);
        let previous = self.entries.insert(frame_index, entry);
        if previous.is_some() {
            tracing::debug!(frame_index, "Frame replaced");
        }
        previous
    }

    pub fn get(&self, frame_index: u32) -> Option<&FrameEntry> {
        self.entries.get(&frame_index)
    }

    pub fn contains(&self, frame_index: u32) -> bool {
        self.entries.contains_key(&frame_index)
    }

    pub fn is_pending(&self, frame_index: u32) -> bool {
        self.pending.contains(&frame_index)
    }

    /// 判断帧是否已确定丢失
    ///
    /// `known_total` 仅在 video_complete 之后为 Some：此后不会再有新帧到达，
    /// 范围内既不存在也不在解码中的索引永远不会出现
    pub fn is_lost(&self, frame_index: u32, known_total: Option<u32>) -> bool {
        match known_total {
            Some(total) => {
                frame_index < total
                    && !self.entries.contains_key(&frame_index)
                    && !self.pending.contains(&frame_index)
            }
            None => false,
        }
    }

    /// 从 0 开始连续可用的帧数
    pub fn contiguous_len(&self) -> u32 {
        let mut n = 0;
        while self.entries.contains_key(&n) {
            n += 1;
        }
        n
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending.clear();
    }
}
