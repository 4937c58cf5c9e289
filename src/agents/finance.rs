//! finance Agent：记账（桩逻辑）
//!
//! data: {amount, category?, description?, currency?}；amount 可为数字或数字字符串且必须大于 0。
//! 有 storage 授权时把记录追加到 `expenses` 列表。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agents::traits::{call_tool, first_str};
use crate::agents::{Agent, Payload};
use crate::core::AgentError;
use crate::tools::ToolManager;

pub struct FinanceAgent {
    tools: Arc<ToolManager>,
}

impl FinanceAgent {
    pub fn new(tools: Arc<ToolManager>) -> Self {
        Self { tools }
    }
}

fn parse_amount(value: Option<&Value>) -> Result<f64, AgentError> {
    let amount = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_start_matches('$').parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| AgentError::InvalidInput("'amount' must be a number".into()))?;

    if !amount.is_finite() || amount <= 0.0 {
        return Err(AgentError::InvalidInput(format!(
            "'amount' must be positive, got {amount}"
        )));
    }
    Ok(amount)
}

#[async_trait]
impl Agent for FinanceAgent {
    fn name(&self) -> &str {
        "finance"
    }

    fn description(&self) -> &str {
        "Logs expenses. data: {amount, category, description, currency}"
    }

    async fn process(&self, data: &Payload) -> Result<Payload, AgentError> {
        let amount = parse_amount(data.get("amount"))?;
        let expense = json!({
            "amount": amount,
            "category": first_str(data, &["category"]).unwrap_or("uncategorized"),
            "description": first_str(data, &["description", "note"]).unwrap_or(""),
            "currency": first_str(data, &["currency"]).unwrap_or("USD"),
            "logged_at": chrono::Utc::now().to_rfc3339(),
        });

        let persisted = call_tool(
            &self.tools,
            self.name(),
            "storage",
            json!({ "action": "append", "key": "expenses", "value": expense }),
        )
        .await?
        .is_some();

        let mut out = Payload::new();
        out.insert("logged".into(), json!(true));
        out.insert("persisted".into(), json!(persisted));
        out.insert("expense".into(), expense);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::StorageTool;

    fn agent() -> FinanceAgent {
        let mut tools = ToolManager::new();
        tools.register(StorageTool::new());
        tools.grant("finance", ["storage"]);
        FinanceAgent::new(Arc::new(tools))
    }

    #[tokio::test]
    async fn test_logs_expense() {
        let data = json!({"amount": 25, "category": "food"});
        let out = agent().process(data.as_object().unwrap()).await.unwrap();
        assert_eq!(out["logged"], true);
        assert_eq!(out["persisted"], true);
        assert_eq!(out["expense"]["amount"], 25.0);
        assert_eq!(out["expense"]["category"], "food");
        assert_eq!(out["expense"]["currency"], "USD");
    }

    #[tokio::test]
    async fn test_amount_from_string() {
        let data = json!({"amount": "$12.50"});
        let out = agent().process(data.as_object().unwrap()).await.unwrap();
        assert_eq!(out["expense"]["amount"], 12.5);
        assert_eq!(out["expense"]["category"], "uncategorized");
    }

    #[tokio::test]
    async fn test_invalid_amounts_rejected() {
        for data in [json!({}), json!({"amount": "lots"}), json!({"amount": -3})] {
            let err = agent().process(data.as_object().unwrap()).await.unwrap_err();
            assert!(matches!(err, AgentError::InvalidInput(_)), "{data}");
        }
    }

    #[tokio::test]
    async fn test_without_storage_grant_not_persisted() {
        let agent = FinanceAgent::new(Arc::new(ToolManager::new()));
        let data = json!({"amount": 3});
        let out = agent.process(data.as_object().unwrap()).await.unwrap();
        assert_eq!(out["persisted"], false);
    }
}
