//! general Agent：通用兜底，回显请求内容

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agents::traits::{call_tool, first_str};
use crate::agents::{Agent, Payload};
use crate::core::AgentError;
use crate::tools::ToolManager;

pub struct GeneralAgent {
    tools: Arc<ToolManager>,
}

impl GeneralAgent {
    pub fn new(tools: Arc<ToolManager>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Agent for GeneralAgent {
    fn name(&self) -> &str {
        "general"
    }

    fn description(&self) -> &str {
        "General-purpose handler used when no specialised agent applies. data: {query}"
    }

    async fn process(&self, data: &Payload) -> Result<Payload, AgentError> {
        let text = first_str(data, &["query", "message", "text", "search"])
            .map(String::from)
            .unwrap_or_else(|| Value::Object(data.clone()).to_string());

        let echoed = call_tool(&self.tools, self.name(), "echo", json!({ "text": text })).await?;
        let message = echoed
            .as_ref()
            .and_then(|v| v.get("text"))
            .and_then(Value::as_str)
            .unwrap_or(&text)
            .to_string();

        let mut out = Payload::new();
        out.insert("message".into(), json!(message));
        Ok(out)
    }
}
