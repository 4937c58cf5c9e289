//! Planner：调用 LLM 生成执行计划
//!
//! 拼 system prompt（可用 Agent 列表 + 计划 JSON 格式）与用户请求后调用 LLM，再交给 parse_plan 修复。
//! LLM 失败或超时不视为请求错误：按空文本处理，最终得到兜底计划。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::llm::{LlmClient, Message};
use crate::plan::{parse_plan, ExecutionPlan};

/// 组装 system prompt，列出可路由的 Agent
pub fn build_system_prompt(agents: &[String]) -> String {
    format!(
        "You are a personal assistant triage planner. Split the user's request into tasks \
         for the available agents and reply with JSON only.\n\
         Available agents: {}\n\
         Format: {{\"tasks\":[{{\"agent\":\"<agent>\",\"data\":{{...}}}}],\
         \"response\":\"<short reply to the user>\",\"intent\":\"<intent>\"}}",
        agents.join(", ")
    )
}

/// Planner：持有 LLM、system prompt 与单次调用超时
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
    timeout: Duration,
}

impl Planner {
    /// `timeout_secs` 为 0 时按 1 秒处理并记 warn
    pub fn new(
        llm: Arc<dyn LlmClient>,
        system_prompt: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        if timeout_secs == 0 {
            tracing::warn!("LLM timeout of 0s is not allowed, using 1s");
        }
        Self {
            llm,
            system_prompt: system_prompt.into(),
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    /// 调 LLM 拿原始文本；失败时返回空串
    pub async fn generate(&self, request: &str) -> String {
        let messages = [
            Message::system(self.system_prompt.clone()),
            Message::user(request),
        ];
        match timeout(self.timeout, self.llm.complete(&messages)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "LLM call failed, continuing with fallback plan");
                String::new()
            }
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "LLM call timed out");
                String::new()
            }
        }
    }

    /// 生成并解析计划
    pub async fn plan(&self, request: &str) -> ExecutionPlan {
        let raw = self.generate(request).await;
        parse_plan(&raw, request)
    }
}
