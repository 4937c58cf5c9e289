//! 请求处理阶段（单个请求的状态机）
//!
//! Received → Parsed → Routed → Executed → Assembled → Sent，阶段之间不回退、不重试。
//! 只有配置层面的致命错误（服务构造失败）会让请求在中途结束。

use std::fmt;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum PipelineStage {
    Received,
    Parsed,
    Routed,
    Executed,
    Assembled,
    Sent,
}

impl PipelineStage {
    /// 下一个阶段；Sent 为终态
    pub fn next(self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Received => Some(PipelineStage::Parsed),
            PipelineStage::Parsed => Some(PipelineStage::Routed),
            PipelineStage::Routed => Some(PipelineStage::Executed),
            PipelineStage::Executed => Some(PipelineStage::Assembled),
            PipelineStage::Assembled => Some(PipelineStage::Sent),
            PipelineStage::Sent => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == PipelineStage::Sent
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Received => "received",
            PipelineStage::Parsed => "parsed",
            PipelineStage::Routed => "routed",
            PipelineStage::Executed => "executed",
            PipelineStage::Assembled => "assembled",
            PipelineStage::Sent => "sent",
        };
        f.write_str(name)
    }
}

/// 单个请求的阶段跟踪；只允许按顺序前进
#[derive(Debug)]
pub struct StageTracker {
    current: PipelineStage,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self {
            current: PipelineStage::Received,
        }
    }
}

impl StageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> PipelineStage {
        self.current
    }

    /// 前进到下一阶段并记录日志；已是终态时保持不变
    pub fn advance(&mut self) -> PipelineStage {
        if let Some(next) = self.current.next() {
            tracing::debug!(from = %self.current, to = %next, "pipeline stage");
            self.current = next;
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages_advance_in_order() {
        let mut tracker = StageTracker::new();
        let mut seen = vec![tracker.current()];
        while !tracker.current().is_terminal() {
            seen.push(tracker.advance());
        }
        assert_eq!(
            seen,
            vec![
                PipelineStage::Received,
                PipelineStage::Parsed,
                PipelineStage::Routed,
                PipelineStage::Executed,
                PipelineStage::Assembled,
                PipelineStage::Sent,
            ]
        );
        assert_eq!(tracker.advance(), PipelineStage::Sent);
    }
}
