//! 任务执行器：按计划顺序逐个执行任务，单个任务失败不影响其他任务
//!
//! 每个任务：路由 → 在超时内调用 Agent.process → 记为 Success / Failure；
//! 结果以计划里的原始 Agent 引用为键（保留 LLM 的用词），顺序与计划一致、不去重。
//! 先为全部任务路由（route_plan），再逐个执行（run）；只有容器层错误（Agent 构造失败等配置问题）
//! 会中断整个计划。每次执行输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::time::timeout;

use crate::agents::Payload;
use crate::core::{AgentError, AgentRouter, PipelineError, RouteError, RoutedAgent};
use crate::plan::ExecutionPlan;

/// 单个任务的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskResult {
    Success { payload: Payload },
    Failure { message: String },
}

impl TaskResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success { .. })
    }
}

/// 带上下文的任务结果
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    /// 计划中的原始 Agent 引用
    pub agent: String,
    /// 实际处理的 Agent 名（兜底时与原始引用不同）；路由失败时为 None
    pub handler: Option<String>,
    pub result: TaskResult,
    pub duration_ms: u64,
}

/// 单个任务的路由结果；只有 NoHandlerAvailable 会留到执行阶段
pub type TaskRoute = Result<RoutedAgent, RouteError>;

/// 任务执行器：持有路由器与单任务超时
pub struct TaskExecutor {
    router: AgentRouter,
    timeout: Duration,
}

impl TaskExecutor {
    /// `timeout_secs` 为 0 时按 1 秒处理并记 warn
    pub fn new(router: AgentRouter, timeout_secs: u64) -> Self {
        if timeout_secs == 0 {
            tracing::warn!("task timeout of 0s is not allowed, using 1s");
        }
        Self {
            router,
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }

    pub fn router(&self) -> &AgentRouter {
        &self.router
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 为计划中每个任务解析 Agent（首次访问时由容器构造）；容器错误对整个计划是致命的
    pub fn route_plan(&self, plan: &ExecutionPlan) -> Result<Vec<TaskRoute>, PipelineError> {
        let mut routes = Vec::with_capacity(plan.tasks.len());
        for task in &plan.tasks {
            match self.router.route(&task.agent) {
                Ok(routed) => {
                    if routed.fallback {
                        tracing::debug!(
                            agent = %task.agent,
                            handler = %routed.key,
                            "task served by fallback"
                        );
                    }
                    routes.push(Ok(routed));
                }
                Err(RouteError::Container(e)) => return Err(e.into()),
                Err(e @ RouteError::NoHandlerAvailable { .. }) => {
                    tracing::warn!(
                        agent = %task.agent,
                        error = %e,
                        "task has no handler, marking failed"
                    );
                    routes.push(Err(e));
                }
            }
        }
        Ok(routes)
    }

    /// 按顺序执行已路由的任务；`routes` 与 `plan.tasks` 一一对应
    pub async fn run(&self, plan: &ExecutionPlan, routes: Vec<TaskRoute>) -> Vec<TaskOutcome> {
        let mut outcomes = Vec::with_capacity(plan.tasks.len());
        for (task, route) in plan.tasks.iter().zip(routes) {
            let start = Instant::now();
            let (handler, result) = match route {
                Ok(routed) => {
                    let processed = timeout(self.timeout, routed.agent.process(&task.data)).await;
                    let result = match processed {
                        Ok(Ok(payload)) => TaskResult::Success { payload },
                        Ok(Err(e)) => TaskResult::Failure {
                            message: e.to_string(),
                        },
                        Err(_) => TaskResult::Failure {
                            message: AgentError::Timeout(self.timeout.as_secs()).to_string(),
                        },
                    };
                    (Some(routed.agent.name().to_string()), result)
                }
                Err(e) => (
                    None,
                    TaskResult::Failure {
                        message: e.to_string(),
                    },
                ),
            };

            let duration_ms = start.elapsed().as_millis() as u64;
            let audit = serde_json::json!({
                "event": "task_audit",
                "agent": task.agent,
                "handler": handler,
                "ok": result.is_success(),
                "duration_ms": duration_ms,
            });
            tracing::info!(audit = %audit, "task");

            outcomes.push(TaskOutcome {
                agent: task.agent.clone(),
                handler,
                result,
                duration_ms,
            });
        }
        outcomes
    }

    /// 路由并顺序执行计划中的全部任务
    pub async fn execute(&self, plan: &ExecutionPlan) -> Result<Vec<TaskOutcome>, PipelineError> {
        let routes = self.route_plan(plan)?;
        Ok(self.run(plan, routes).await)
    }
}
