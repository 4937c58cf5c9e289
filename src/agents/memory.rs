//! memory Agent：记录与检索用户信息（基于 storage 工具）
//!
//! data.operation：`store`（content/value，可选 key）或 `retrieve`（search/query，默认操作）。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agents::traits::{call_tool, first_str};
use crate::agents::{Agent, Payload};
use crate::core::AgentError;
use crate::tools::ToolManager;

pub struct MemoryAgent {
    tools: Arc<ToolManager>,
}

impl MemoryAgent {
    pub fn new(tools: Arc<ToolManager>) -> Self {
        Self { tools }
    }

    async fn store(&self, data: &Payload) -> Result<Payload, AgentError> {
        let content = first_str(data, &["content", "value", "text"])
            .ok_or_else(|| AgentError::InvalidInput("store requires 'content'".into()))?;
        let key = first_str(data, &["key"])
            .map(String::from)
            .unwrap_or_else(|| content.chars().take(40).collect());

        let stored = call_tool(
            &self.tools,
            self.name(),
            "storage",
            json!({ "action": "put", "key": key, "value": content }),
        )
        .await?;

        let mut out = Payload::new();
        out.insert("operation".into(), json!("store"));
        out.insert("key".into(), json!(key));
        out.insert("stored".into(), json!(stored.is_some()));
        if stored.is_none() {
            out.insert("degraded".into(), json!(true));
        }
        Ok(out)
    }

    async fn retrieve(&self, data: &Payload) -> Result<Payload, AgentError> {
        let search = first_str(data, &["search", "query"])
            .ok_or_else(|| AgentError::InvalidInput("retrieve requires 'search'".into()))?;

        let found = call_tool(
            &self.tools,
            self.name(),
            "storage",
            json!({ "action": "search", "query": search }),
        )
        .await?;

        let mut out = Payload::new();
        out.insert("operation".into(), json!("retrieve"));
        out.insert("search".into(), json!(search));
        match found {
            Some(result) => {
                let matches = result.get("matches").cloned().unwrap_or(Value::Array(vec![]));
                out.insert("results".into(), matches);
            }
            None => {
                out.insert("results".into(), json!([]));
                out.insert("degraded".into(), json!(true));
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl Agent for MemoryAgent {
    fn name(&self) -> &str {
        "memory"
    }

    fn description(&self) -> &str {
        "Stores and retrieves personal notes. data: {operation: store|retrieve, content, search}"
    }

    async fn process(&self, data: &Payload) -> Result<Payload, AgentError> {
        match first_str(data, &["operation"]).unwrap_or("retrieve") {
            "store" | "save" | "remember" => self.store(data).await,
            "retrieve" | "search" | "recall" => self.retrieve(data).await,
            other => Err(AgentError::InvalidInput(format!(
                "unknown memory operation '{other}'"
            ))),
        }
    }
}
