//! 编排器：单个请求的主流程
//!
//! 请求 → Planner 拿原始文本 → parse_plan 修复为计划 → TaskExecutor 逐个路由并执行 →
//! ResponseAssembler 组装响应并在后台写历史。LLM 故障与单任务故障都在各自环节内消化，
//! 只有容器层错误以 PipelineError 返回，由 `handle_json` 渲染为顶层错误响应。

use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;

use crate::agents::AgentKind;
use crate::config::AppConfig;
use crate::core::builder::{HISTORY_SERVICE, LLM_SERVICE};
use crate::core::{
    AgentRouter, PipelineError, ResponseAssembler, ResponsePayload, ServiceContainer, StageTracker,
    TaskExecutor,
};
use crate::llm::LlmClient;
use crate::memory::HistoryHook;
use crate::plan::{build_system_prompt, parse_plan, Planner};

/// 编排器：持有容器与各环节组件，可跨请求复用
pub struct Orchestrator {
    container: Arc<ServiceContainer>,
    planner: Planner,
    executor: TaskExecutor,
    assembler: ResponseAssembler,
    debug: bool,
}

impl Orchestrator {
    /// 从已注册好的容器装配；llm / history 在这里首次实例化
    pub fn from_container(
        container: Arc<ServiceContainer>,
        cfg: &AppConfig,
    ) -> Result<Self, PipelineError> {
        let llm = container.get::<Arc<dyn LlmClient>>(LLM_SERVICE)?;
        let history = container.get::<Arc<dyn HistoryHook>>(HISTORY_SERVICE)?;

        let namespace = cfg.router.namespace.as_str();
        let agents: Vec<String> = AgentKind::ALL
            .iter()
            .map(|k| k.name())
            .filter(|name| container.has(&format!("{namespace}{name}")))
            .map(String::from)
            .collect();
        if agents.is_empty() {
            return Err(PipelineError::Config(format!(
                "no agents registered under namespace '{namespace}'"
            )));
        }

        let planner = Planner::new(llm, build_system_prompt(&agents), cfg.llm.timeout_secs);
        let router = AgentRouter::new(container.clone(), cfg.router.clone());
        let executor = TaskExecutor::new(router, cfg.executor.task_timeout_secs);

        Ok(Self {
            container,
            planner,
            executor,
            assembler: ResponseAssembler::new(history),
            debug: cfg.app.debug,
        })
    }

    pub fn container(&self) -> &Arc<ServiceContainer> {
        &self.container
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    /// 处理一条请求
    pub async fn handle(&self, request: &str) -> Result<ResponsePayload, PipelineError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("request", request_id = %request_id);
        async move {
            tracing::info!(chars = request.chars().count(), "request received");
            let raw = self.planner.generate(request).await;
            self.process_raw(request, &raw).await
        }
        .instrument(span)
        .await
    }

    /// 从 LLM 原始文本开始的后半段流程（解析 → 路由执行 → 组装）
    pub async fn process_raw(
        &self,
        request: &str,
        raw: &str,
    ) -> Result<ResponsePayload, PipelineError> {
        let mut stage = StageTracker::new();

        let plan = parse_plan(raw, request);
        stage.advance();
        tracing::info!(intent = %plan.intent, tasks = plan.tasks.len(), "plan ready");

        let routes = self.executor.route_plan(&plan)?;
        stage.advance();

        let outcomes = self.executor.run(&plan, routes).await;
        stage.advance();

        let failed = outcomes.iter().filter(|o| !o.result.is_success()).count();
        let payload = self.assembler.assemble_and_record(request, &plan, outcomes);
        stage.advance();

        tracing::info!(components = payload.components.len(), failed, "response assembled");
        stage.advance();
        Ok(payload)
    }

    /// 等待后台历史写入完成；进程退出前调用
    pub async fn shutdown(&self) {
        self.assembler.flush().await;
    }

    /// 处理请求并渲染为 JSON；致命错误转为顶层错误响应
    pub async fn handle_json(&self, request: &str) -> Value {
        match self.handle(request).await {
            Ok(payload) => payload.to_value(),
            Err(e) => {
                tracing::error!(error = %e, "request failed");
                e.to_error_response(self.debug)
            }
        }
    }
}
