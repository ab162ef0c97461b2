//! Buffering Gate - 播放启动前的缓冲门控

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 门控策略，每个会话只启用一种
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GatePolicy {
    /// 请求发出后等待固定预热时长
    Warmup,
    /// 等待第一个 scene_complete 信号
    #[default]
    SceneComplete,
}

impl std::fmt::Display for GatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatePolicy::Warmup => write!(f, "warmup"),
            GatePolicy::SceneComplete => write!(f, "scene_complete"),
        }
    }
}

/// 触发门控的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTrigger {
    WarmupElapsed,
    SceneComplete,
}

/// 缓冲门控
///
/// 只有与策略匹配的第一次触发会打开门控，之后的触发都是 no-op
#[derive(Debug, Clone)]
pub struct BufferingGate {
    policy: GatePolicy,
    warmup: Duration,
    opened: bool,
}

impl BufferingGate {
    pub fn new(policy: GatePolicy, warmup: Duration) -> Self {
        Self {
            policy,
            warmup,
            opened: false,
        }
    }

    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    pub fn is_open(&self) -> bool {
        self.opened
    }

    /// 需要计时的预热时长（仅 Warmup 策略）
    pub fn warmup(&self) -> Option<Duration> {
        match self.policy {
            GatePolicy::Warmup => Some(self.warmup),
            GatePolicy::SceneComplete => None,
        }
    }

    /// 提交一次触发，返回本次是否打开了门控
    pub fn offer(&mut self, trigger: GateTrigger) -> bool {
        if self.opened {
            return false;
        }
        let matches = matches!(
            (self.policy, trigger),
            (GatePolicy::Warmup, GateTrigger::WarmupElapsed)
                | (GatePolicy::SceneComplete, GateTrigger::SceneComplete)
        );
        if matches {
            self.opened = true;
        }
        matches
    }
}
