//! 容器构建器：统一的服务注册逻辑
//!
//! 把配置、LLM、工具表、历史钩子与各领域 Agent 注册进 ServiceContainer，
//! CLI 与测试都经由这里拿到同一套装配结果。

use std::sync::Arc;

use crate::agents::{Agent, AgentKind};
use crate::config::AppConfig;
use crate::core::{Orchestrator, PipelineError, ServiceContainer};
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient};
use crate::memory::{FileHistory, HistoryHook, NoopHistory};
use crate::tools::{EchoTool, StorageTool, ToolManager, WeatherTool};

pub const CONFIG_SERVICE: &str = "config";
pub const LLM_SERVICE: &str = "llm";
pub const TOOLS_SERVICE: &str = "tools";
pub const HISTORY_SERVICE: &str = "history";

/// 根据配置与环境变量选择 LLM 后端（DeepSeek / OpenAI 兼容 / Mock）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    if provider == "mock" {
        tracing::info!("Using Mock LLM (configured)");
        return Arc::new(MockLlmClient);
    }

    let has_deepseek_key = std::env::var("DEEPSEEK_API_KEY").is_ok();
    let has_openai_key = std::env::var("OPENAI_API_KEY").is_ok();

    if provider == "deepseek" && (has_deepseek_key || has_openai_key) {
        let model = cfg.llm.model.as_deref();
        tracing::info!(
            model = model.unwrap_or(crate::llm::DEEPSEEK_CHAT),
            "Using DeepSeek LLM"
        );
        Arc::new(create_deepseek_client(model))
    } else if provider == "openai" && has_openai_key {
        let model = cfg.llm.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string());
        tracing::info!(model = %model, "Using OpenAI LLM");
        Arc::new(OpenAiClient::new(cfg.llm.base_url.as_deref(), &model, None))
    } else {
        tracing::warn!(provider = %provider, "No API key set or provider unknown, using Mock LLM");
        Arc::new(MockLlmClient)
    }
}

/// 按配置构造工具表：注册内置工具，写入各 Agent 的默认授权，再用 [permissions] 覆盖
pub fn build_tool_manager(cfg: &AppConfig, kinds: &[AgentKind]) -> ToolManager {
    let mut tools = ToolManager::new();
    tools.register(EchoTool);
    tools.register(WeatherTool);
    tools.register(StorageTool::new());

    for kind in kinds {
        tools.grant(kind.name(), kind.default_tools().iter().copied());
    }
    for (agent, granted) in &cfg.permissions {
        tools.grant(agent, granted.iter().map(String::as_str));
    }
    tools
}

/// 容器构建器
pub struct ContainerBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    history: Option<Arc<dyn HistoryHook>>,
    agents: Vec<AgentKind>,
}

impl ContainerBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            history: None,
            agents: AgentKind::ALL.to_vec(),
        }
    }

    /// 指定 LLM 客户端（不再按配置选择）
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// 指定历史钩子（不再按 [history] 段构造）
    pub fn with_history(mut self, history: Arc<dyn HistoryHook>) -> Self {
        self.history = Some(history);
        self
    }

    /// 只注册给定的领域 Agent
    pub fn with_agents(mut self, kinds: &[AgentKind]) -> Self {
        self.agents = kinds.to_vec();
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 注册全部服务；除 config 外都是懒构造
    pub fn build_container(&self) -> ServiceContainer {
        let mut container = ServiceContainer::new();
        let cfg = self.config.clone();

        container.register_instance(CONFIG_SERVICE, cfg.clone());

        match &self.llm {
            Some(llm) => container.register_instance(LLM_SERVICE, llm.clone()),
            None => container.register(LLM_SERVICE, |c: &ServiceContainer| {
                let cfg = c.get::<AppConfig>(CONFIG_SERVICE)?;
                Ok(create_llm_from_config(&cfg))
            }),
        }

        let kinds = self.agents.clone();
        container.register(TOOLS_SERVICE, move |c: &ServiceContainer| {
            let cfg = c.get::<AppConfig>(CONFIG_SERVICE)?;
            Ok(Arc::new(build_tool_manager(&cfg, &kinds)))
        });

        match &self.history {
            Some(history) => container.register_instance(HISTORY_SERVICE, history.clone()),
            None => container.register(HISTORY_SERVICE, |c: &ServiceContainer| {
                let cfg = c.get::<AppConfig>(CONFIG_SERVICE)?;
                let history: Arc<dyn HistoryHook> = if cfg.history.enabled {
                    Arc::new(FileHistory::new(&cfg.history.path, cfg.history.max_entries))
                } else {
                    Arc::new(NoopHistory)
                };
                Ok(history)
            }),
        }

        for kind in &self.agents {
            let kind = *kind;
            let id = format!("{}{}", cfg.router.namespace, kind.name());
            container.register(id, move |c: &ServiceContainer| {
                let tools = c.get::<Arc<ToolManager>>(TOOLS_SERVICE)?;
                let agent: Arc<dyn Agent> = kind.build(tools);
                Ok(agent)
            });
        }

        tracing::debug!(services = ?container.service_ids(), "service container ready");
        container
    }

    /// 构建容器并装配编排器
    pub fn build(self) -> Result<Orchestrator, PipelineError> {
        let container = Arc::new(self.build_container());
        Orchestrator::from_container(container, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolAccess;

    #[test]
    fn test_registers_all_services_lazily() {
        let container = ContainerBuilder::new(AppConfig::default())
            .with_llm(Arc::new(MockLlmClient))
            .with_history(Arc::new(NoopHistory))
            .build_container();

        let ids = [
            "config",
            "llm",
            "tools",
            "history",
            "agent.memory",
            "agent.finance",
            "agent.weather",
            "agent.general",
        ];
        for id in ids {
            assert!(container.has(id), "missing service {id}");
        }
        assert!(!container.is_instantiated("agent.finance"));
        let agent = container.get::<Arc<dyn Agent>>("agent.finance").unwrap();
        assert_eq!(agent.name(), "finance");
        assert!(container.is_instantiated("tools"));
    }

    #[test]
    fn test_with_agents_limits_registration() {
        let container = ContainerBuilder::new(AppConfig::default())
            .with_agents(&[AgentKind::Memory])
            .build_container();
        assert!(container.has("agent.memory"));
        assert!(!container.has("agent.finance"));
    }

    #[test]
    fn test_config_permissions_replace_defaults() {
        let mut cfg = AppConfig::default();
        cfg.permissions
            .insert("weather".to_string(), vec!["echo".to_string()]);
        let tools = build_tool_manager(&cfg, &AgentKind::ALL);

        assert!(tools.can_access("weather", "echo"));
        assert!(!tools.can_access("weather", "weather"));
        assert!(tools.can_access("finance", "storage"));
        assert!(matches!(
            tools.resolve("weather", Some("weather")),
            ToolAccess::Denied { .. }
        ));
    }

    #[test]
    fn test_mock_provider_selected_explicitly() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".to_string();
        let llm = create_llm_from_config(&cfg);
        assert_eq!(llm.token_usage(), (0, 0, 0));
    }

    #[tokio::test]
    async fn test_history_disabled_uses_noop() {
        let mut cfg = AppConfig::default();
        cfg.history.enabled = false;
        let container = ContainerBuilder::new(cfg).build_container();
        let history = container.get::<Arc<dyn HistoryHook>>("history").unwrap();
        assert!(history
            .record(&serde_json::json!({}), &serde_json::json!({}))
            .await
            .is_ok());
    }
}
