//! 响应组装：把计划、各任务结果与计划中的回复合并为最终响应，并调用历史钩子
//!
//! components 以原始 Agent 引用为键、按计划顺序输出；同一引用再次出现时键为 `<ref>#2`、`<ref>#3`。
//! 历史钩子在后台任务里执行，响应不等待写入；钩子失败只记 warn。`flush` 等待尚未完成的写入。

use std::sync::{Arc, Mutex, PoisonError};

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::task::JoinSet;

use crate::core::{normalize_agent_name, TaskOutcome, TaskResult};
use crate::memory::HistoryHook;
use crate::plan::ExecutionPlan;

/// 响应中的单个组件（对应一个任务）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Component {
    /// 处理该任务的 Agent（规范化名）
    #[serde(rename = "type")]
    pub kind: String,
    pub status: ComponentStatus,
    /// 成功时为 Agent 输出；失败时为 {"error": message}
    pub data: Value,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Success,
    Error,
}

/// 最终响应
#[derive(Debug, Clone, Serialize)]
pub struct ResponsePayload {
    pub status: String,
    pub plan: ExecutionPlan,
    #[serde(serialize_with = "serialize_components")]
    pub components: Vec<(String, Component)>,
    pub response: String,
    pub timestamp: i64,
}

impl ResponsePayload {
    /// 按键查找组件
    pub fn component(&self, key: &str) -> Option<&Component> {
        self.components
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, c)| c)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to serialize response payload");
            json!({ "status": self.status, "response": self.response })
        })
    }
}

fn serialize_components<S>(
    components: &[(String, Component)],
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(components.len()))?;
    for (key, component) in components {
        map.serialize_entry(key, component)?;
    }
    map.end()
}

/// 响应组装器：持有历史钩子与后台写入任务
pub struct ResponseAssembler {
    history: Arc<dyn HistoryHook>,
    pending: Mutex<JoinSet<()>>,
}

impl ResponseAssembler {
    pub fn new(history: Arc<dyn HistoryHook>) -> Self {
        Self {
            history,
            pending: Mutex::new(JoinSet::new()),
        }
    }

    /// 组装响应（不写历史）
    pub fn assemble(&self, plan: &ExecutionPlan, outcomes: Vec<TaskOutcome>) -> ResponsePayload {
        let timestamp = chrono::Utc::now().timestamp();
        let mut components: Vec<(String, Component)> = Vec::with_capacity(outcomes.len());

        for outcome in outcomes {
            let key = unique_key(&components, &outcome.agent);
            let kind = outcome
                .handler
                .unwrap_or_else(|| normalize_agent_name(&outcome.agent));
            let (status, data) = match outcome.result {
                TaskResult::Success { payload } => {
                    (ComponentStatus::Success, Value::Object(payload))
                }
                TaskResult::Failure { message } => {
                    (ComponentStatus::Error, json!({ "error": message }))
                }
            };
            components.push((
                key,
                Component {
                    kind,
                    status,
                    data,
                    timestamp,
                },
            ));
        }

        ResponsePayload {
            status: "success".to_string(),
            plan: plan.clone(),
            components,
            response: plan.response.clone(),
            timestamp,
        }
    }

    /// 组装后把历史写入交给后台任务，立即返回响应；需在 tokio 运行时内调用
    pub fn assemble_and_record(
        &self,
        request: &str,
        plan: &ExecutionPlan,
        outcomes: Vec<TaskOutcome>,
    ) -> ResponsePayload {
        let payload = self.assemble(plan, outcomes);
        let request = json!({ "query": request });
        let response = payload.to_value();
        let history = self.history.clone();

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            if let Err(e) = history.record(&request, &response).await {
                tracing::warn!(error = %e, "failed to record history, response unaffected");
            }
        });
        payload
    }

    /// 等待所有尚未完成的历史写入
    pub async fn flush(&self) {
        let mut pending = {
            let mut guard = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "history task aborted");
            }
        }
    }
}

/// 重复引用加 `#n` 后缀
fn unique_key(existing: &[(String, Component)], agent: &str) -> String {
    let taken = |candidate: &str| existing.iter().any(|(k, _)| k == candidate);
    if !taken(agent) {
        return agent.to_string();
    }
    (2..)
        .map(|n| format!("{agent}#{n}"))
        .find(|candidate| !taken(candidate.as_str()))
        .unwrap_or_else(|| agent.to_string())
}
