//! Agent 路由：把计划里的 Agent 引用规范化为服务 id，并在缺失时走确定性的兜底链
//!
//! 规范化：小写 → 去掉 [a-z0-9] 以外字符 → 去掉末尾的 "agent" 后缀 → 加命名空间前缀，
//! 因此 "MemoryAgent"、"memory_agent"、"memory" 都落到 `agent.memory`。
//! 兜底链：请求的 Agent → generic_fallback → default_fallback，全部缺失时返回 NoHandlerAvailable。

use std::sync::Arc;

use crate::agents::Agent;
use crate::config::RouterSection;
use crate::core::{RouteError, ServiceContainer};

const AGENT_SUFFIX: &str = "agent";

/// 规范化 Agent 名（不含命名空间）；幂等
pub fn normalize_agent_name(reference: &str) -> String {
    let mut name: String = reference
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect();
    // 只剩 "agent" 时保留，避免得到空名字
    while name.len() > AGENT_SUFFIX.len() && name.ends_with(AGENT_SUFFIX) {
        name.truncate(name.len() - AGENT_SUFFIX.len());
    }
    name
}

/// 路由结果
#[derive(Clone)]
pub struct RoutedAgent {
    /// 实际使用的服务 id
    pub key: String,
    /// 是否走了兜底
    pub fallback: bool,
    pub agent: Arc<dyn Agent>,
}

impl std::fmt::Debug for RoutedAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutedAgent")
            .field("key", &self.key)
            .field("fallback", &self.fallback)
            .finish()
    }
}

/// Agent 路由器：持有服务容器与兜底配置
pub struct AgentRouter {
    container: Arc<ServiceContainer>,
    settings: RouterSection,
}

impl AgentRouter {
    pub fn new(container: Arc<ServiceContainer>, settings: RouterSection) -> Self {
        Self {
            container,
            settings,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.settings.namespace
    }

    /// 规范化为服务 id；已带命名空间的 id 原样规范化，保证 resolve 幂等
    pub fn resolve(&self, reference: &str) -> String {
        let namespace = &self.settings.namespace;
        let trimmed = reference.trim();
        let bare = match trimmed.get(..namespace.len()) {
            Some(prefix) if !namespace.is_empty() && prefix.eq_ignore_ascii_case(namespace) => {
                &trimmed[namespace.len()..]
            }
            _ => trimmed,
        };
        format!("{}{}", namespace, normalize_agent_name(bare))
    }

    /// 兜底链中的服务 id（顺序固定）
    pub fn fallback_keys(&self) -> Vec<String> {
        vec![
            self.resolve(&self.settings.generic_fallback),
            self.resolve(&self.settings.default_fallback),
        ]
    }

    /// 只做 id 解析，不实例化 Agent
    pub fn resolve_key(&self, reference: &str) -> Result<(String, bool), RouteError> {
        let requested = self.resolve(reference);
        if self.container.has(&requested) {
            return Ok((requested, false));
        }

        let mut tried = vec![requested.clone()];
        for key in self.fallback_keys() {
            if tried.contains(&key) {
                continue;
            }
            if self.container.has(&key) {
                tracing::warn!(
                    agent = reference,
                    requested = %requested,
                    fallback = %key,
                    "agent not registered, routing to fallback"
                );
                return Ok((key, true));
            }
            tried.push(key);
        }

        Err(RouteError::NoHandlerAvailable {
            agent: reference.to_string(),
            tried,
        })
    }

    /// 解析并取出 Agent 实例（首次访问时由容器构造）
    pub fn route(&self, reference: &str) -> Result<RoutedAgent, RouteError> {
        let (key, fallback) = self.resolve_key(reference)?;
        let agent = self.container.get::<Arc<dyn Agent>>(&key)?;
        Ok(RoutedAgent {
            key,
            fallback,
            agent,
        })
    }
}
