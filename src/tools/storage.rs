//! 存储工具：进程内键值存储，供 memory / finance Agent 使用
//!
//! 支持 action：put（key + value）、get（key）、search（query，大小写不敏感的子串匹配）、append（key + value，追加到数组）。

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::tools::Tool;

#[derive(Default)]
pub struct StorageTool {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl StorageTool {
    pub fn new() -> Self {
        Self::default()
    }
}

fn required_str<'a>(params: &'a Value, field: &str) -> Result<&'a str, String> {
    params
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing '{field}'"))
}

#[async_trait]
impl Tool for StorageTool {
    fn name(&self) -> &str {
        "storage"
    }

    fn description(&self) -> &str {
        "Key-value storage. Args: {\"action\": \"put|get|search|append\", \"key\", \"value\", \"query\"}"
    }

    async fn execute(&self, params: Value) -> Result<Value, String> {
        let action = required_str(&params, "action")?;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match action {
            "put" => {
                let key = required_str(&params, "key")?;
                let value = params.get("value").cloned().unwrap_or(Value::Null);
                entries.insert(key.to_string(), value);
                Ok(json!({ "stored": key }))
            }
            "append" => {
                let key = required_str(&params, "key")?;
                let value = params.get("value").cloned().unwrap_or(Value::Null);
                let slot = entries
                    .entry(key.to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                match slot {
                    Value::Array(items) => {
                        items.push(value);
                        Ok(json!({ "stored": key, "count": items.len() }))
                    }
                    _ => Err(format!("'{key}' is not a list")),
                }
            }
            "get" => {
                let key = required_str(&params, "key")?;
                Ok(json!({
                    "key": key,
                    "value": entries.get(key).cloned().unwrap_or(Value::Null),
                }))
            }
            "search" => {
                let query = required_str(&params, "query")?.to_lowercase();
                let matches: Vec<Value> = entries
                    .iter()
                    .filter(|(key, value)| {
                        key.to_lowercase().contains(&query)
                            || value.to_string().to_lowercase().contains(&query)
                    })
                    .map(|(key, value)| json!({ "key": key, "value": value }))
                    .collect();
                Ok(json!({ "query": query, "matches": matches }))
            }
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_search() {
        let storage = StorageTool::new();
        storage
            .execute(json!({"action": "put", "key": "dentist", "value": "Tuesday 3pm"}))
            .await
            .unwrap();
        storage
            .execute(json!({"action": "put", "key": "gym", "value": "Monday"}))
            .await
            .unwrap();

        let out = storage
            .execute(json!({"action": "search", "query": "tuesday"}))
            .await
            .unwrap();
        let matches = out["matches"].as_array().unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0]["key"], "dentist");
    }

    #[tokio::test]
    async fn test_append_builds_list() {
        let storage = StorageTool::new();
        storage
            .execute(json!({"action": "append", "key": "expenses", "value": {"amount": 5}}))
            .await
            .unwrap();
        let out = storage
            .execute(json!({"action": "append", "key": "expenses", "value": {"amount": 7}}))
            .await
            .unwrap();
        assert_eq!(out["count"], 2);

        storage
            .execute(json!({"action": "put", "key": "x", "value": 1}))
            .await
            .unwrap();
        let err = storage
            .execute(json!({"action": "append", "key": "x", "value": 2}))
            .await
            .unwrap_err();
        assert!(err.contains("not a list"));
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let err = StorageTool::new()
            .execute(json!({"action": "drop"}))
            .await
            .unwrap_err();
        assert!(err.contains("drop"));
    }
}
