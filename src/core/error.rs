//! 错误类型：按层划分
//!
//! - ContainerError：服务容器（注册缺失、工厂失败、类型不符），请求级致命错误
//! - RouteError：Agent 路由失败（含兜底链全部缺失）
//! - AgentError：单个任务内部失败，只记录到该任务的 component，不中断计划
//! - PipelineError：整条请求的致命错误，渲染为顶层 error 响应

use serde_json::{json, Value};
use thiserror::Error;

/// 服务容器错误
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// 工厂执行失败；失败结果不缓存，下次 get 会重试工厂
    #[error("Failed to create service '{id}': {source}")]
    ServiceCreation {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Service '{id}' is not of type {expected}")]
    TypeMismatch { id: String, expected: &'static str },
}

/// Agent 路由错误
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("No handler available for agent '{agent}' (tried: {})", .tried.join(", "))]
    NoHandlerAvailable { agent: String, tried: Vec<String> },

    #[error(transparent)]
    Container(#[from] ContainerError),
}

/// 单个任务执行中的错误（TaskExecutor 捕获后写入 Failure）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("Task timed out after {0}s")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// 请求级致命错误：只有配置 / 容器层面的问题会走到这里
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error("Config error: {0}")]
    Config(String),
}

impl PipelineError {
    /// 渲染为顶层错误响应；debug 为 false 时不暴露内部细节
    pub fn to_error_response(&self, debug: bool) -> Value {
        let mut body = json!({
            "status": "error",
            "message": "Internal error while processing the request",
        });
        if debug {
            let mut chain = Vec::new();
            let mut source = std::error::Error::source(self);
            while let Some(err) = source {
                chain.push(err.to_string());
                source = err.source();
            }
            body["debug"] = json!({
                "error": self.to_string(),
                "causes": chain,
            });
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_hides_details_without_debug() {
        let err = PipelineError::from(ContainerError::ServiceNotFound("llm".into()));
        let body = err.to_error_response(false);
        assert_eq!(body["status"], "error");
        assert!(body.get("debug").is_none());
    }

    #[test]
    fn test_error_response_includes_cause_chain_in_debug() {
        let err = PipelineError::from(ContainerError::ServiceCreation {
            id: "tools".into(),
            source: anyhow::anyhow!("backend offline"),
        });
        let body = err.to_error_response(true);
        assert!(body["debug"]["error"].as_str().unwrap().contains("tools"));
        let causes = body["debug"]["causes"].as_array().unwrap();
        assert!(causes.iter().any(|c| c.as_str().unwrap().contains("backend offline")));
    }

    #[test]
    fn test_no_handler_message_lists_tried_keys() {
        let err = RouteError::NoHandlerAvailable {
            agent: "Travel".into(),
            tried: vec!["agent.travel".into(), "agent.general".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("agent.travel, agent.general"));
    }
}
