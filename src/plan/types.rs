//! 执行计划数据结构（与 LLM 约定的 JSON 形状一致）
//!
//! `{"tasks":[{"agent":"<string>","data":{...}}],"response":"<string>","intent":"<string>"}`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 计划中的单个任务：目标 Agent 引用（大小写、格式任意）+ 参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub agent: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl TaskSpec {
    pub fn new(agent: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            agent: agent.into(),
            data,
        }
    }
}

/// 校验后的执行计划：tasks 非空，response 非空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub tasks: Vec<TaskSpec>,
    pub response: String,
    pub intent: String,
}
