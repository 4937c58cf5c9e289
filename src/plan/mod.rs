//! 计划层：数据结构、LLM 文本解析与修复、Planner

pub mod parser;
pub mod planner;
pub mod types;

pub use parser::{
    acknowledge, fallback_plan, fallback_task, parse_plan, FALLBACK_AGENT, FALLBACK_INTENT,
    UNKNOWN_INTENT,
};
pub use planner::{build_system_prompt, Planner};
pub use types::{ExecutionPlan, TaskSpec};
