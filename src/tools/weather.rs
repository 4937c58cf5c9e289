//! 天气工具（桩数据）
//!
//! 不访问外部服务：按地点名生成确定性的温度与天气描述，便于测试与本地演示。

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::tools::Tool;

const CONDITIONS: [&str; 5] = ["sunny", "cloudy", "rainy", "windy", "overcast"];

pub struct WeatherTool;

impl WeatherTool {
    /// 同一地点总是得到同一结果
    fn forecast(location: &str) -> (i64, &'static str) {
        let seed = location
            .to_lowercase()
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let temperature = (seed % 35) as i64 - 5;
        let condition = CONDITIONS[(seed / 35) as usize % CONDITIONS.len()];
        (temperature, condition)
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "weather"
    }

    fn description(&self) -> &str {
        "Current weather for a location. Args: {\"location\": \"city\"}"
    }

    async fn execute(&self, params: Value) -> Result<Value, String> {
        let location = params
            .get("location")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "missing 'location'".to_string())?;
        let (temperature, condition) = Self::forecast(location);
        Ok(json!({
            "location": location,
            "temperature_c": temperature,
            "condition": condition,
        }))
    }
}
