//! weather Agent：查询天气；没有 weather 工具授权时返回降级结果而不是失败

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agents::traits::{call_tool, first_str};
use crate::agents::{Agent, Payload};
use crate::core::AgentError;
use crate::tools::ToolManager;

const DEFAULT_LOCATION: &str = "current location";

pub struct WeatherAgent {
    tools: Arc<ToolManager>,
}

impl WeatherAgent {
    pub fn new(tools: Arc<ToolManager>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Agent for WeatherAgent {
    fn name(&self) -> &str {
        "weather"
    }

    fn description(&self) -> &str {
        "Looks up the weather. data: {location}"
    }

    async fn process(&self, data: &Payload) -> Result<Payload, AgentError> {
        let location = first_str(data, &["location", "city"]).unwrap_or(DEFAULT_LOCATION);
        let report = call_tool(
            &self.tools,
            self.name(),
            "weather",
            json!({ "location": location }),
        )
        .await?;

        let mut out = Payload::new();
        out.insert("location".into(), json!(location));
        match report {
            Some(report) => {
                out.insert("weather".into(), report);
            }
            None => {
                out.insert("weather".into(), Value::Null);
                out.insert("degraded".into(), json!(true));
                out.insert("note".into(), json!("weather data unavailable"));
            }
        }
        Ok(out)
    }
}
