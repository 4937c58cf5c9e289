//! Agent 抽象与已知 Agent 枚举
//!
//! 路由只认固定的 AgentKind 集合：启动时每个 kind 以 `<namespace><name>` 注册进服务容器，
//! 未知名字是一次查找未命中，交给路由兜底链处理，不做任何按名反射构造。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::agents::{FinanceAgent, GeneralAgent, MemoryAgent, WeatherAgent};
use crate::core::AgentError;
use crate::tools::{ToolAccess, ToolManager};

/// Agent 的输入与输出都是 JSON 对象
pub type Payload = Map<String, Value>;

/// Agent trait：处理某一领域的单个任务
#[async_trait]
pub trait Agent: Send + Sync {
    /// 规范化后的名字（也是权限表中的 key）
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn process(&self, data: &Payload) -> Result<Payload, AgentError>;
}

/// 已知 Agent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentKind {
    Memory,
    Finance,
    Weather,
    General,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Memory,
        AgentKind::Finance,
        AgentKind::Weather,
        AgentKind::General,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AgentKind::Memory => "memory",
            AgentKind::Finance => "finance",
            AgentKind::Weather => "weather",
            AgentKind::General => "general",
        }
    }

    /// 内置默认授权（配置中的 [permissions] 会整体替换）
    pub fn default_tools(self) -> &'static [&'static str] {
        match self {
            AgentKind::Memory => &["storage"],
            AgentKind::Finance => &["storage"],
            AgentKind::Weather => &["weather"],
            AgentKind::General => &["echo"],
        }
    }

    pub fn build(self, tools: Arc<ToolManager>) -> Arc<dyn Agent> {
        match self {
            AgentKind::Memory => Arc::new(MemoryAgent::new(tools)),
            AgentKind::Finance => Arc::new(FinanceAgent::new(tools)),
            AgentKind::Weather => Arc::new(WeatherAgent::new(tools)),
            AgentKind::General => Arc::new(GeneralAgent::new(tools)),
        }
    }
}

/// 以 Agent 身份调用工具：未授权返回 Ok(None)，工具失败转为 ToolFailed
pub(crate) async fn call_tool(
    tools: &ToolManager,
    agent: &str,
    tool: &str,
    params: Value,
) -> Result<Option<Value>, AgentError> {
    match tools.resolve(tool, Some(agent)) {
        ToolAccess::Granted(instance) => instance
            .execute(params)
            .await
            .map(Some)
            .map_err(|message| AgentError::ToolFailed {
                tool: tool.to_string(),
                message,
            }),
        ToolAccess::Denied { .. } => {
            tracing::info!(agent, tool, "tool not granted, continuing without it");
            Ok(None)
        }
    }
}

/// 取第一个存在且非空的字符串字段
pub(crate) fn first_str<'a>(data: &'a Payload, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| data.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_names_are_unique() {
        let mut names: Vec<&str> = AgentKind::ALL.iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), AgentKind::ALL.len());
    }

    #[test]
    fn test_built_agent_reports_kind_name() {
        let tools = Arc::new(ToolManager::new());
        for kind in AgentKind::ALL {
            assert_eq!(kind.build(tools.clone()).name(), kind.name());
        }
    }

    #[test]
    fn test_first_str_skips_blank_and_non_string() {
        let data = json!({"a": "  ", "b": 3, "c": " hi "});
        let data = data.as_object().unwrap();
        assert_eq!(first_str(data, &["a", "b", "c"]), Some("hi"));
        assert_eq!(first_str(data, &["missing"]), None);
    }
}
