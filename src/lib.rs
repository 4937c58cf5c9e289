//! Triage - 个人助理请求分诊与编排
//!
//! 模块划分：
//! - **agents**: 领域 Agent（memory / finance / weather / general）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 服务容器、Agent 路由、任务执行、响应组装与主流程
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 对话历史钩子
//! - **plan**: 执行计划结构、LLM 输出修复与 Planner
//! - **tools**: 工具表、权限与内置工具

pub mod agents;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod plan;
pub mod tools;

pub use crate::core::{ContainerBuilder, Orchestrator, ResponsePayload};
