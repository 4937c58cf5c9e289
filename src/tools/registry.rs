//! 工具注册表与权限表
//!
//! 所有工具实现 Tool trait（name / description / execute），由 ToolManager 按名注册；
//! Agent 通过 `resolve(tool, Some(agent))` 取工具，未授权时得到 `ToolAccess::Denied`（正常结果，不是错误）。
//! 请求的工具没有具体实现时返回回显输入的 MockTool，保证流程不因后端缺失而中断。

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::MockTool;

/// 工具 trait：名称、描述、异步执行（参数与结果均为 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（权限表中的 key）
    fn name(&self) -> &str;

    /// 工具描述
    fn description(&self) -> &str;

    /// 执行工具
    async fn execute(&self, params: Value) -> Result<Value, String>;
}

/// 工具访问结果
#[derive(Clone)]
pub enum ToolAccess {
    Granted(Arc<dyn Tool>),
    /// 调用方 Agent 没有该工具的授权
    Denied { tool: String, agent: String },
}

impl ToolAccess {
    pub fn is_granted(&self) -> bool {
        matches!(self, ToolAccess::Granted(_))
    }

    /// 授权时返回工具，拒绝时返回 None（调用方据此降级）
    pub fn into_tool(self) -> Option<Arc<dyn Tool>> {
        match self {
            ToolAccess::Granted(tool) => Some(tool),
            ToolAccess::Denied { .. } => None,
        }
    }
}

impl std::fmt::Debug for ToolAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolAccess::Granted(tool) => f.debug_tuple("Granted").field(&tool.name()).finish(),
            ToolAccess::Denied { tool, agent } => f
                .debug_struct("Denied")
                .field("tool", tool)
                .field("agent", agent)
                .finish(),
        }
    }
}

/// 工具管理器：工具实例 + Agent → 工具集合 的授权表
///
/// 启动时 register / grant 完成后只读共享（`Arc<ToolManager>`）；
/// 唯一的运行期可变状态是 Mock 工具缓存。
#[derive(Default)]
pub struct ToolManager {
    tools: HashMap<String, Arc<dyn Tool>>,
    permissions: HashMap<String, BTreeSet<String>>,
    mocks: Mutex<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// 用新集合替换 Agent 的全部授权（不合并，后写者生效）
    pub fn grant<I, S>(&mut self, agent: &str, tools: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = tools.into_iter().map(Into::into).collect();
        if let Some(previous) = self.permissions.insert(agent.to_string(), set) {
            tracing::debug!(agent, ?previous, "tool grants replaced");
        }
    }

    /// 在现有授权上追加
    pub fn grant_additional<I, S>(&mut self, agent: &str, tools: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions
            .entry(agent.to_string())
            .or_default()
            .extend(tools.into_iter().map(Into::into));
    }

    pub fn can_access(&self, agent: &str, tool: &str) -> bool {
        self.permissions
            .get(agent)
            .map(|set| set.contains(tool))
            .unwrap_or(false)
    }

    /// Agent 已获授权的工具名（已排序）
    pub fn granted(&self, agent: &str) -> Vec<String> {
        self.permissions
            .get(agent)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 取工具实例。`agent` 为 None 时跳过权限检查（内部直接访问）
    pub fn resolve(&self, tool: &str, agent: Option<&str>) -> ToolAccess {
        if let Some(agent) = agent {
            if !self.can_access(agent, tool) {
                tracing::debug!(agent, tool, "tool access denied");
                return ToolAccess::Denied {
                    tool: tool.to_string(),
                    agent: agent.to_string(),
                };
            }
        }

        if let Some(found) = self.tools.get(tool) {
            return ToolAccess::Granted(found.clone());
        }

        let mut mocks = self.mocks.lock().unwrap_or_else(PoisonError::into_inner);
        let mock = mocks.entry(tool.to_string()).or_insert_with(|| {
            tracing::warn!(tool, "no implementation registered, using mock tool");
            Arc::new(MockTool::new(tool))
        });
        ToolAccess::Granted(mock.clone())
    }

    /// 已注册的具体工具名（已排序，不含 Mock）
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ToolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolManager")
            .field("tools", &self.tool_names())
            .field("permissions", &self.permissions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::EchoTool;
    use serde_json::json;

    fn manager() -> ToolManager {
        let mut tools = ToolManager::new();
        tools.register(EchoTool);
        tools
    }

    #[test]
    fn test_grant_replaces_previous_set() {
        let mut tools = manager();
        tools.grant("weather", ["echo", "search"]);
        tools.grant("weather", ["weather"]);
        assert!(!tools.can_access("weather", "echo"));
        assert!(tools.can_access("weather", "weather"));
        assert_eq!(tools.granted("weather"), vec!["weather".to_string()]);
    }

    #[test]
    fn test_grant_additional_merges() {
        let mut tools = manager();
        tools.grant("memory", ["storage"]);
        tools.grant_additional("memory", ["echo"]);
        assert_eq!(
            tools.granted("memory"),
            vec!["echo".to_string(), "storage".to_string()]
        );
    }

    #[test]
    fn test_resolve_denied_without_grant() {
        let tools = manager();
        let access = tools.resolve("echo", Some("finance"));
        assert!(!access.is_granted());
        match access {
            ToolAccess::Denied { tool, agent } => {
                assert_eq!(tool, "echo");
                assert_eq!(agent, "finance");
            }
            ToolAccess::Granted(_) => panic!("Expected Denied"),
        }
    }

    #[test]
    fn test_resolve_without_agent_skips_check() {
        let tools = manager();
        let tool = tools.resolve("echo", None).into_tool().unwrap();
        assert_eq!(tool.name(), "echo");
    }

    #[tokio::test]
    async fn test_missing_tool_falls_back_to_cached_mock() {
        let mut tools = manager();
        tools.grant("planner", ["calendar"]);

        let first = tools.resolve("calendar", Some("planner")).into_tool().unwrap();
        let second = tools.resolve("calendar", Some("planner")).into_tool().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(tools.tool_names().iter().all(|n| n != "calendar"));

        let out = first.execute(json!({"date": "2024-05-01"})).await.unwrap();
        assert_eq!(out["input"]["date"], "2024-05-01");
        assert_eq!(out["mock"], true);
    }
}
