//! Mock 工具：没有具体实现的工具名由 ToolManager 自动替换为它，原样回显输入

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::tools::Tool;

/// 回显输入参数，附带 `mock: true` 标记，便于在响应中识别降级
pub struct MockTool {
    name: String,
}

impl MockTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Mock tool (no backend configured). Echoes its input."
    }

    async fn execute(&self, params: Value) -> Result<Value, String> {
        Ok(json!({
            "tool": self.name,
            "mock": true,
            "input": params,
        }))
    }
}
