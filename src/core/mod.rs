//! 核心编排层：服务容器、Agent 路由、任务执行、响应组装与主流程

pub mod assembler;
pub mod builder;
pub mod container;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod router;
pub mod state;

pub use assembler::{Component, ComponentStatus, ResponseAssembler, ResponsePayload};
pub use builder::{build_tool_manager, create_llm_from_config, ContainerBuilder};
pub use container::ServiceContainer;
pub use error::{AgentError, ContainerError, PipelineError, RouteError};
pub use executor::{TaskExecutor, TaskOutcome, TaskResult};
pub use orchestrator::Orchestrator;
pub use router::{normalize_agent_name, AgentRouter, RoutedAgent};
pub use state::{PipelineStage, StageTracker};
