//! Mock LLM 客户端（用于测试与无 API Key 场景）
//!
//! 取最后一条 User 消息，生成一个交给 general Agent 的单任务计划。

use async_trait::async_trait;
use serde_json::json;

use crate::llm::{LlmClient, Message, Role};

/// Mock 客户端：把用户最后一条消息包装成计划 JSON
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        let plan = json!({
            "tasks": [{ "agent": "general", "data": { "query": last_user } }],
            "response": format!("Echo from Mock: {last_user}"),
            "intent": "chat",
        });
        Ok(plan.to_string())
    }
}
