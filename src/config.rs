//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `TRIAGE__*` 覆盖（双下划线表示嵌套，如 `TRIAGE__LLM__PROVIDER=openai`）。

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub router: RouterSection,
    pub executor: ExecutorSection,
    pub history: HistorySection,
    /// [permissions] 段：agent = ["tool", ...]，每项整体替换该 Agent 的内置授权
    pub permissions: BTreeMap<String, Vec<String>>,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 顶层错误响应是否附带内部错误细节
    #[serde(default)]
    pub debug: bool,
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：deepseek / openai / mock；实际选择还取决于是否设置了 API Key
    #[serde(default = "default_provider")]
    pub provider: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// 单次计划生成超时（秒）
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    60
}

/// [router] 段：Agent 服务 id 前缀与兜底链
#[derive(Debug, Clone, Deserialize)]
pub struct RouterSection {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// 兜底链第一站：通用 Agent
    #[serde(default = "default_generic_fallback")]
    pub generic_fallback: String,
    /// 兜底链第二站：默认领域 Agent
    #[serde(default = "default_domain_fallback")]
    pub default_fallback: String,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            generic_fallback: default_generic_fallback(),
            default_fallback: default_domain_fallback(),
        }
    }
}

fn default_namespace() -> String {
    "agent.".to_string()
}

fn default_generic_fallback() -> String {
    "general".to_string()
}

fn default_domain_fallback() -> String {
    "memory".to_string()
}

/// [executor] 段
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorSection {
    /// 单个任务超时（秒），超时记为该任务失败
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            task_timeout_secs: default_task_timeout_secs(),
        }
    }
}

fn default_task_timeout_secs() -> u64 {
    30
}

/// [history] 段：对话历史文件
#[derive(Debug, Clone, Deserialize)]
pub struct HistorySection {
    #[serde(default = "default_history_enabled")]
    pub enabled: bool,
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
    /// 文件中最多保留的条目数，超出丢弃最旧的
    #[serde(default = "default_history_max_entries")]
    pub max_entries: usize,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            enabled: default_history_enabled(),
            path: default_history_path(),
            max_entries: default_history_max_entries(),
        }
    }
}

fn default_history_enabled() -> bool {
    true
}

fn default_history_path() -> PathBuf {
    PathBuf::from("data/history.json")
}

fn default_history_max_entries() -> usize {
    200
}

/// 加载配置，环境变量 TRIAGE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 TRIAGE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    if let Some(name) = default_names
        .into_iter()
        .find(|name| std::path::Path::new(&format!("{name}.toml")).exists())
    {
        builder = builder.add_source(config::File::with_name(name).required(false));
    }

    if let Some(path) = config_path.filter(|p| p.exists()) {
        builder = builder.add_source(config::File::from(path).required(false));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("TRIAGE")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert!(!cfg.app.debug);
        assert_eq!(cfg.router.namespace, "agent.");
        assert_eq!(cfg.router.generic_fallback, "general");
        assert_eq!(cfg.router.default_fallback, "memory");
        assert_eq!(cfg.executor.task_timeout_secs, 30);
        assert_eq!(cfg.llm.timeout_secs, 60);
        assert!(cfg.history.enabled);
        assert!(cfg.permissions.is_empty());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[app]
debug = true

[router]
generic_fallback = "assistant"

[executor]
task_timeout_secs = 5

[permissions]
weather = ["weather", "search"]
"#
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert!(cfg.app.debug);
        assert_eq!(cfg.router.generic_fallback, "assistant");
        assert_eq!(cfg.router.namespace, "agent.");
        assert_eq!(cfg.executor.task_timeout_secs, 5);
        assert_eq!(
            cfg.permissions.get("weather"),
            Some(&vec!["weather".to_string(), "search".to_string()])
        );
    }
}
