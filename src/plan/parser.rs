//! 计划解析：把 LLM 原始文本修复为可用的 ExecutionPlan
//!
//! 依次尝试：整体 JSON → ```json 代码块 → 文本中最外层 `{...}`；
//! 都失败时合成兜底计划（交给 memory Agent 检索原始问题）。解析永不失败，异常只记 warn 日志。

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};

use crate::plan::{ExecutionPlan, TaskSpec};

/// 兜底计划路由到的 Agent
pub const FALLBACK_AGENT: &str = "memory";
/// 兜底计划的 intent
pub const FALLBACK_INTENT: &str = "information_retrieval";
/// LLM 未给出 intent 时使用
pub const UNKNOWN_INTENT: &str = "unknown";

static FENCE_RE: OnceLock<Regex> = OnceLock::new();

/// 对用户问题的回显式回复（response 缺失时使用）
pub fn acknowledge(query: &str) -> String {
    format!("I understand you're asking about: {}", query.trim())
}

/// 兜底任务：memory Agent 检索原始问题
pub fn fallback_task(query: &str) -> TaskSpec {
    let mut data = Map::new();
    data.insert("operation".into(), json!("retrieve"));
    data.insert("search".into(), json!(query));
    TaskSpec::new(FALLBACK_AGENT, data)
}

/// 完全无法解析时的兜底计划
pub fn fallback_plan(query: &str) -> ExecutionPlan {
    ExecutionPlan {
        tasks: vec![fallback_task(query)],
        response: acknowledge(query),
        intent: FALLBACK_INTENT.to_string(),
    }
}

/// 解析 LLM 输出；`query` 为用户原始请求，用于兜底与默认回复
pub fn parse_plan(raw: &str, query: &str) -> ExecutionPlan {
    match extract_object(raw) {
        Some(object) => normalize(object, query),
        None => {
            tracing::warn!(
                raw_preview = %preview(raw),
                "LLM output is not a JSON plan, using fallback plan"
            );
            fallback_plan(query)
        }
    }
}

/// 从文本中找出 JSON 对象：整体解析 → 代码块 → 最外层花括号
fn extract_object(raw: &str) -> Option<Map<String, Value>> {
    let trimmed = raw.trim();
    if let Some(object) = parse_object(trimmed) {
        return Some(object);
    }

    let fence = FENCE_RE.get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").unwrap());
    for captures in fence.captures_iter(trimmed) {
        if let Some(object) = captures.get(1).and_then(|m| parse_object(m.as_str().trim())) {
            tracing::debug!("plan extracted from fenced block");
            return Some(object);
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    let object = parse_object(&trimmed[start..=end])?;
    tracing::debug!("plan extracted from surrounding prose");
    Some(object)
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// 校验并补默认值：tasks 缺失/非数组/无有效项 → 兜底任务；response 缺失/空 → 回显
fn normalize(mut object: Map<String, Value>, query: &str) -> ExecutionPlan {
    let tasks = match object.remove("tasks") {
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let task = task_from_value(item);
                if task.is_none() {
                    tracing::warn!(index, "dropping malformed task entry");
                }
                task
            })
            .collect(),
        _ => Vec::new(),
    };
    let tasks = if tasks.is_empty() {
        tracing::warn!("plan has no usable tasks, substituting fallback task");
        vec![fallback_task(query)]
    } else {
        tasks
    };

    let response = match object.remove("response") {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        _ => {
            tracing::warn!("plan has no response, substituting acknowledgement");
            acknowledge(query)
        }
    };

    let intent = match object.remove("intent") {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        _ => UNKNOWN_INTENT.to_string(),
    };

    ExecutionPlan {
        tasks,
        response,
        intent,
    }
}

/// 单个任务：agent 必须是非空字符串；data 非对象时按空对象处理
fn task_from_value(item: Value) -> Option<TaskSpec> {
    let Value::Object(mut fields) = item else {
        return None;
    };
    let agent = match fields.remove("agent") {
        Some(Value::String(agent)) if !agent.trim().is_empty() => agent,
        _ => return None,
    };
    let data = match fields.remove("data") {
        Some(Value::Object(data)) => data,
        _ => Map::new(),
    };
    Some(TaskSpec::new(agent, data))
}

fn preview(raw: &str) -> String {
    if raw.chars().count() > 120 {
        format!("{}...", raw.chars().take(120).collect::<String>())
    } else {
        raw.to_string()
    }
}
